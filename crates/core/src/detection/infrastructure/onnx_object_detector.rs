/// Object detector using ONNX Runtime via `ort`.
///
/// Expects a YOLO-style detection head: one output of shape
/// `[1, 4 + num_classes, num_boxes]` (or its transpose) where each box is
/// `[cx, cy, w, h, class scores...]` in letterboxed input pixels.
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::object_detector::{ObjectDetector, RunningMode, RunningModeGuard};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::detection::{Category, Detection};
use crate::shared::frame::Frame;

use super::coco_labels::COCO_LABELS;
use super::execution_provider::execution_providers_for;

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Ranked categories kept per detection.
const MAX_CATEGORIES_PER_DETECTION: usize = 3;

/// Object detector backed by an ONNX Runtime session.
pub struct OnnxObjectDetector {
    session: ort::session::Session,
    options: DetectorOptions,
    guard: RunningModeGuard,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxObjectDetector {
    /// Load the model named in `options` and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn create_from_options(options: DetectorOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(execution_providers_for(options.delegate))?
            .commit_from_file(&options.model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded object detector {} (input {input_size}px, mode {})",
            options.model_path.display(),
            options.running_mode
        );

        Ok(Self {
            session,
            guard: RunningModeGuard::new(options.running_mode),
            options,
            labels: COCO_LABELS.iter().map(|s| s.to_string()).collect(),
            input_size,
        })
    }

    /// Replaces the category names indexed by class id.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.input_size);
        let input_tensor = letterbox.tensor(frame);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detection model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_predictions(data, tensor.shape(), self.options.score_threshold)?;
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        let frame_w = frame.width() as f64;
        let frame_h = frame.height() as f64;
        let detections = kept
            .into_iter()
            .map(|r| {
                let bbox = letterbox.to_source(&r.bbox).clamp_to(frame_w, frame_h);
                let categories = r
                    .classes
                    .iter()
                    .map(|&(class_id, score)| Category {
                        category_name: self
                            .labels
                            .get(class_id)
                            .cloned()
                            .unwrap_or_else(|| format!("class_{class_id}")),
                        score,
                        index: Some(class_id as u32),
                    })
                    .collect();
                Detection::new(bbox, categories)
            })
            .collect();

        Ok(self.options.apply(detections))
    }
}

impl ObjectDetector for OnnxObjectDetector {
    fn running_mode(&self) -> RunningMode {
        self.guard.mode()
    }

    fn set_running_mode(&mut self, mode: RunningMode) -> Result<(), Box<dyn std::error::Error>> {
        self.guard.set_mode(mode);
        self.options.running_mode = mode;
        Ok(())
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        self.guard.check_image()?;
        self.infer(frame)
    }

    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        self.guard.check_video(timestamp_ms)?;
        self.infer(frame)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding that fit a frame into a square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    target_size: u32,
    scale: f64,
    new_w: u32,
    new_h: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(frame_w: u32, frame_h: u32, target_size: u32) -> Self {
        let target = target_size as f64;
        let scale = (target / frame_w as f64).min(target / frame_h as f64);
        let new_w = (frame_w as f64 * scale).round() as u32;
        let new_h = (frame_h as f64 * scale).round() as u32;
        Self {
            target_size,
            scale,
            new_w,
            new_h,
            pad_x: (target_size - new_w) / 2,
            pad_y: (target_size - new_h) / 2,
        }
    }

    /// NCHW float32 tensor, gray-padded (114/255, YOLO convention).
    fn tensor(&self, frame: &Frame) -> ndarray::Array4<f32> {
        let size = self.target_size as usize;
        let gray = 114.0f32 / 255.0;
        let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

        let src = frame.as_ndarray(); // [H, W, C] u8
        let src_h = frame.height() as usize;
        let src_w = frame.width() as usize;

        // Nearest-neighbor resize into the padded region
        for y in 0..self.new_h as usize {
            let src_y = ((y as f64 / self.scale) as usize).min(src_h - 1);
            for x in 0..self.new_w as usize {
                let src_x = ((x as f64 / self.scale) as usize).min(src_w - 1);
                let ty = self.pad_y as usize + y;
                let tx = self.pad_x as usize + x;
                for c in 0..3 {
                    tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
                }
            }
        }
        tensor
    }

    /// Maps a box in model-input pixels back to source-frame pixels.
    fn to_source(&self, b: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (b.origin_x - self.pad_x as f64) / self.scale,
            (b.origin_y - self.pad_y as f64) / self.scale,
            b.width / self.scale,
            b.height / self.scale,
        )
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    /// Box in model-input pixels.
    bbox: BoundingBox,
    /// `(class_id, score)` ranked best first.
    classes: Vec<(usize, f32)>,
}

impl RawDetection {
    fn score(&self) -> f32 {
        self.classes.first().map_or(0.0, |c| c.1)
    }
}

/// Decodes a `[1, features, boxes]` or `[1, boxes, features]` output.
///
/// The layout is inferred from which axis is smaller: class features
/// (4 + classes) are always fewer than candidate boxes.
fn parse_predictions(
    data: &[f32],
    shape: &[usize],
    min_score: f32,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected detection output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_boxes, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Err(format!("Detection output has too few features: {shape:?}").into());
    }
    if data.len() < num_boxes * num_feats {
        return Err("Detection output shorter than its shape".into());
    }

    let value = |i: usize, f: usize| {
        if transposed {
            data[f * num_boxes + i]
        } else {
            data[i * num_feats + f]
        }
    };

    let mut raw = Vec::new();
    for i in 0..num_boxes {
        let mut classes: Vec<(usize, f32)> = (4..num_feats)
            .map(|f| (f - 4, value(i, f)))
            .filter(|&(_, s)| s >= min_score)
            .collect();
        if classes.is_empty() {
            continue;
        }
        classes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        classes.truncate(MAX_CATEGORIES_PER_DETECTION);

        let cx = value(i, 0) as f64;
        let cy = value(i, 1) as f64;
        let w = value(i, 2) as f64;
        let h = value(i, 3) as f64;
        raw.push(RawDetection {
            bbox: BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h),
            classes,
        });
    }
    Ok(raw)
}

/// Greedy class-agnostic NMS: sort by score descending, suppress overlaps.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && dets[i].bbox.iou(&dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
