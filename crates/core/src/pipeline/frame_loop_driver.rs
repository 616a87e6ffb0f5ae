use std::time::Instant;

use crate::camera::domain::camera_source::CameraStream;
use crate::detection::domain::object_detector::RunningMode;
use crate::pipeline::detector_slot::DetectorSlot;
use crate::shared::detection::Detection;
use crate::shared::error::LiveViewError;

/// What one refresh tick did.
#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
    /// The stream has not produced a frame yet.
    NoFrame,
    /// Playback time unchanged since the previous tick; no detection ran.
    Duplicate,
    /// A new frame was run through the detector.
    Detected {
        detections: Vec<Detection>,
        timestamp_ms: f64,
    },
}

/// Runs at most one detection per unique camera frame.
///
/// The detector is switched from `Image` to `Video` running mode once,
/// before the first streaming call. Detection timestamps are milliseconds
/// since the driver was created and strictly increase.
pub struct FrameLoopDriver {
    slot: DetectorSlot,
    epoch: Instant,
    last_video_time: Option<f64>,
    last_timestamp_ms: Option<f64>,
    video_mode: bool,
}

impl FrameLoopDriver {
    pub fn new(slot: DetectorSlot) -> Self {
        Self {
            slot,
            epoch: Instant::now(),
            last_video_time: None,
            last_timestamp_ms: None,
            video_mode: false,
        }
    }

    pub fn slot(&self) -> &DetectorSlot {
        &self.slot
    }

    /// Polls the loader and reports whether detection can run.
    pub fn detector_status(&mut self) -> Result<(), LiveViewError> {
        self.slot.poll();
        self.slot.status()
    }

    /// Forgets the last seen playback time, e.g. after the camera changed.
    pub fn reset_stream(&mut self) {
        self.last_video_time = None;
    }

    pub fn on_frame_ready(&mut self, stream: &mut dyn CameraStream) -> Result<FrameOutcome, LiveViewError> {
        self.detector_status()?;

        let Some(video_time) = stream.current_time() else {
            return Ok(FrameOutcome::NoFrame);
        };
        if self.last_video_time == Some(video_time) {
            return Ok(FrameOutcome::Duplicate);
        }
        self.last_video_time = Some(video_time);

        let Some(frame) = stream.current_frame() else {
            return Ok(FrameOutcome::NoFrame);
        };
        let timestamp_ms = self.next_timestamp_ms();

        let detector = self
            .slot
            .detector_mut()
            .ok_or(LiveViewError::DetectorNotReady)?;

        if !self.video_mode {
            if detector.running_mode() != RunningMode::Video {
                detector
                    .set_running_mode(RunningMode::Video)
                    .map_err(|e| LiveViewError::Detector(e.to_string()))?;
                log::debug!("Detector switched to {} running mode", RunningMode::Video);
            }
            self.video_mode = true;
        }

        let detections = detector
            .detect_for_video(frame, timestamp_ms)
            .map_err(|e| LiveViewError::Detector(e.to_string()))?;

        Ok(FrameOutcome::Detected {
            detections,
            timestamp_ms,
        })
    }

    fn next_timestamp_ms(&mut self) -> f64 {
        let mut ts = self.epoch.elapsed().as_secs_f64() * 1000.0;
        if let Some(prev) = self.last_timestamp_ms {
            if ts <= prev {
                ts = prev + 0.001;
            }
        }
        self.last_timestamp_ms = Some(ts);
        ts
    }
}
