use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use crate::overlay::domain::overlay_element::{OverlayElement, OverlayId, OverlayStyle};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::infrastructure::window_layout::WindowLayout;
use crate::shared::frame::Frame;
use crate::shared::screen_rect::ScreenRect;
use crate::shared::viewport::ViewportLayout;

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 24]);
const DEFAULT_OUTLINE: Rgb<u8> = Rgb([255, 255, 255]);
const PERSON_OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
const ANCHOR_HALF_SIZE: i64 = 3;

/// Renders the mirrored video and its overlays into PNG files.
///
/// Every `every`-th presented frame is written to
/// `<output_dir>/frame_NNNNNN.png`.
pub struct SnapshotOverlayRenderer {
    layout: WindowLayout,
    attached: BTreeMap<OverlayId, OverlayElement>,
    output_dir: PathBuf,
    every: usize,
    presented: usize,
    written: usize,
}

impl SnapshotOverlayRenderer {
    pub fn new(layout: WindowLayout, output_dir: &Path, every: usize) -> Self {
        Self {
            layout,
            attached: BTreeMap::new(),
            output_dir: output_dir.to_path_buf(),
            every: every.max(1),
            presented: 0,
            written: 0,
        }
    }

    /// Number of PNG files written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn snapshot_path(&self, frame: &Frame) -> PathBuf {
        self.output_dir.join(format!("frame_{:06}.png", frame.index()))
    }
}

impl OverlayRenderer for SnapshotOverlayRenderer {
    fn viewport_layout(&self) -> ViewportLayout {
        self.layout.viewport_layout()
    }

    fn apply_full_window(&mut self, full_window: bool) -> Result<(), Box<dyn std::error::Error>> {
        self.layout.set_full_window(full_window);
        Ok(())
    }

    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.layout.set_window_size(width, height)
    }

    fn create_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
        self.attached.insert(overlay.id, overlay.clone());
        Ok(())
    }

    fn update_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
        let existing = self
            .attached
            .get_mut(&overlay.id)
            .ok_or_else(|| format!("overlay {} is not attached", overlay.id))?;
        existing.placement = overlay.placement;
        Ok(())
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), Box<dyn std::error::Error>> {
        self.attached.remove(&id);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.presented += 1;
        if self.presented % self.every != 0 {
            return Ok(());
        }

        let overlays: Vec<&OverlayElement> = self.attached.values().collect();
        let canvas = compose(frame, &self.layout.viewport_layout(), &overlays)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.snapshot_path(frame);
        canvas.save(&path)?;
        self.written += 1;
        log::debug!("Wrote snapshot {}", path.display());
        Ok(())
    }
}

/// Draws `frame`, mirrored and scaled into the content box of `layout`,
/// then outlines each overlay and marks its label anchor.
pub fn compose(
    frame: &Frame,
    layout: &ViewportLayout,
    overlays: &[&OverlayElement],
) -> Result<RgbImage, Box<dyn std::error::Error>> {
    let canvas_w = layout.element_width.round() as i64;
    let canvas_h = layout.element_height.round() as i64;
    let content_w = (layout.element_width - layout.margin_left * 2.0).round() as i64;
    let content_h = (layout.element_height - layout.margin_top * 2.0).round() as i64;
    if canvas_w <= 0 || canvas_h <= 0 || content_w <= 0 || content_h <= 0 {
        return Err(format!(
            "empty display area {}x{}",
            layout.element_width, layout.element_height
        )
        .into());
    }

    let video = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    let mut video = image::imageops::flip_horizontal(&video);
    if (video.width() as i64, video.height() as i64) != (content_w, content_h) {
        video = image::imageops::resize(
            &video,
            content_w as u32,
            content_h as u32,
            image::imageops::FilterType::Triangle,
        );
    }

    let mut canvas = RgbImage::from_pixel(canvas_w as u32, canvas_h as u32, BACKGROUND);
    image::imageops::overlay(
        &mut canvas,
        &video,
        layout.margin_left.round() as i64,
        layout.margin_top.round() as i64,
    );

    for overlay in overlays.iter() {
        let color = match overlay.style {
            OverlayStyle::Person => PERSON_OUTLINE,
            OverlayStyle::Default => DEFAULT_OUTLINE,
        };
        draw_outline(&mut canvas, &overlay.placement, color);
        draw_anchor(&mut canvas, overlay.placement.label_anchor(), color);
    }
    Ok(canvas)
}

fn put_pixel_clipped(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_outline(canvas: &mut RgbImage, rect: &ScreenRect, color: Rgb<u8>) {
    let left = rect.left.round() as i64;
    let top = rect.top.round() as i64;
    let right = rect.right().round() as i64 - 1;
    let bottom = rect.bottom().round() as i64 - 1;
    if right < left || bottom < top {
        return;
    }
    for x in left..=right {
        put_pixel_clipped(canvas, x, top, color);
        put_pixel_clipped(canvas, x, bottom, color);
    }
    for y in top..=bottom {
        put_pixel_clipped(canvas, left, y, color);
        put_pixel_clipped(canvas, right, y, color);
    }
}

fn draw_anchor(canvas: &mut RgbImage, (ax, ay): (f64, f64), color: Rgb<u8>) {
    let cx = ax.round() as i64;
    let cy = ay.round() as i64;
    for d in -ANCHOR_HALF_SIZE..=ANCHOR_HALF_SIZE {
        put_pixel_clipped(canvas, cx + d, cy, color);
        put_pixel_clipped(canvas, cx, cy + d, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::detection::{Category, Detection};

    const RED: [u8; 3] = [200, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 200];

    /// Left half red, right half blue.
    fn split_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..height {
            for x in 0..width {
                data.extend_from_slice(if x < width / 2 { &RED } else { &BLUE });
            }
        }
        Frame::new(data, width, height, 3, 0, 0.0)
    }

    fn element(id: u64, category: &str, placement: ScreenRect) -> OverlayElement {
        OverlayElement::from_detection(
            OverlayId(id),
            &Detection::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), vec![Category::new(category, 0.9)]),
            placement,
        )
    }

    #[test]
    fn test_compose_mirrors_video() {
        let frame = split_frame(8, 4);
        let canvas = compose(&frame, &ViewportLayout::new(8.0, 4.0), &[]).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, BLUE);
        assert_eq!(canvas.get_pixel(7, 3).0, RED);
    }

    #[test]
    fn test_compose_leaves_margins_as_background() {
        let frame = split_frame(8, 4);
        let layout = ViewportLayout::new(12.0, 8.0).with_margins(2.0, 2.0);
        let canvas = compose(&frame, &layout, &[]).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (12, 8));
        assert_eq!(*canvas.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*canvas.get_pixel(11, 7), BACKGROUND);
        assert_eq!(canvas.get_pixel(2, 2).0, BLUE);
    }

    #[test]
    fn test_compose_draws_styled_outlines() {
        let frame = split_frame(32, 32);
        let person = element(1, "person", ScreenRect::new(2.0, 2.0, 10.0, 10.0));
        let cup = element(2, "cup", ScreenRect::new(18.0, 18.0, 10.0, 10.0));
        let canvas = compose(&frame, &ViewportLayout::new(32.0, 32.0), &[&person, &cup]).unwrap();

        assert_eq!(*canvas.get_pixel(2, 2), PERSON_OUTLINE);
        assert_eq!(*canvas.get_pixel(11, 11), PERSON_OUTLINE);
        assert_eq!(*canvas.get_pixel(18, 27), DEFAULT_OUTLINE);
        // label anchor at the centre
        assert_eq!(*canvas.get_pixel(23, 23), DEFAULT_OUTLINE);
    }

    #[test]
    fn test_compose_clips_offscreen_overlays() {
        let frame = split_frame(8, 8);
        let outside = element(1, "cup", ScreenRect::new(-20.0, -20.0, 100.0, 100.0));
        assert!(compose(&frame, &ViewportLayout::new(8.0, 8.0), &[&outside]).is_ok());
    }

    #[test]
    fn test_compose_rejects_empty_area() {
        let frame = split_frame(8, 8);
        let layout = ViewportLayout::new(8.0, 8.0).with_margins(4.0, 0.0);
        assert!(compose(&frame, &layout, &[]).is_err());
    }

    #[test]
    fn test_present_writes_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("snaps");
        let mut renderer = SnapshotOverlayRenderer::new(WindowLayout::new(64, 48, 16, 12), &out, 2);
        renderer
            .create_overlay(&element(1, "cup", ScreenRect::new(1.0, 1.0, 4.0, 4.0)))
            .unwrap();

        for i in 0..5 {
            let pixels = split_frame(16, 12).data().to_vec();
            let frame = Frame::new(pixels, 16, 12, 3, i, i as f64 / 30.0);
            renderer.present(&frame).unwrap();
        }

        assert_eq!(renderer.written(), 2);
        assert!(out.join("frame_000001.png").exists());
        assert!(out.join("frame_000003.png").exists());
        assert!(!out.join("frame_000000.png").exists());

        let written = image::open(out.join("frame_000001.png")).unwrap();
        assert_eq!((written.width(), written.height()), (16, 12));
    }
}
