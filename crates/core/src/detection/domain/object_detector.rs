use std::fmt;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// How the detector is being fed.
///
/// `Image` accepts independent stills. `Video` accepts a stream of frames
/// whose timestamps must strictly increase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunningMode {
    Image,
    Video,
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunningMode::Image => write!(f, "IMAGE"),
            RunningMode::Video => write!(f, "VIDEO"),
        }
    }
}

/// Domain interface for object detection.
///
/// Implementations start in the running mode given by their options and
/// may be stateful across frames, hence `&mut self`.
pub trait ObjectDetector: Send {
    fn running_mode(&self) -> RunningMode;

    /// Reconfigures the running mode. Resets any per-stream state.
    fn set_running_mode(&mut self, mode: RunningMode) -> Result<(), Box<dyn std::error::Error>>;

    /// Detects objects in a still image. Only valid in `Image` mode.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Detects objects in one frame of a stream. Only valid in `Video` mode;
    /// `timestamp_ms` must be greater than the previous call's.
    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}

/// Enforces running-mode preconditions shared by all detector backends.
#[derive(Clone, Debug)]
pub struct RunningModeGuard {
    mode: RunningMode,
    last_timestamp_ms: Option<f64>,
}

impl RunningModeGuard {
    pub fn new(mode: RunningMode) -> Self {
        Self {
            mode,
            last_timestamp_ms: None,
        }
    }

    pub fn mode(&self) -> RunningMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RunningMode) {
        self.mode = mode;
        self.last_timestamp_ms = None;
    }

    pub fn check_image(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.mode != RunningMode::Image {
            return Err(format!("detect() requires IMAGE running mode, detector is in {}", self.mode).into());
        }
        Ok(())
    }

    /// Validates a streaming call and records its timestamp.
    pub fn check_video(&mut self, timestamp_ms: f64) -> Result<(), Box<dyn std::error::Error>> {
        if self.mode != RunningMode::Video {
            return Err(format!(
                "detect_for_video() requires VIDEO running mode, detector is in {}",
                self.mode
            )
            .into());
        }
        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms <= last {
                return Err(format!(
                    "timestamp must be monotonically increasing: {timestamp_ms} <= {last}"
                )
                .into());
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mode_rejects_video_calls() {
        let mut guard = RunningModeGuard::new(RunningMode::Image);
        assert!(guard.check_image().is_ok());
        assert!(guard.check_video(1.0).is_err());
    }

    #[test]
    fn test_video_mode_rejects_image_calls() {
        let guard = RunningModeGuard::new(RunningMode::Video);
        assert!(guard.check_image().is_err());
    }

    #[test]
    fn test_video_timestamps_must_increase() {
        let mut guard = RunningModeGuard::new(RunningMode::Video);
        assert!(guard.check_video(10.0).is_ok());
        assert!(guard.check_video(20.0).is_ok());
        assert!(guard.check_video(20.0).is_err());
        assert!(guard.check_video(5.0).is_err());
    }

    #[test]
    fn test_set_mode_resets_timestamps() {
        let mut guard = RunningModeGuard::new(RunningMode::Video);
        guard.check_video(100.0).unwrap();
        guard.set_mode(RunningMode::Image);
        guard.set_mode(RunningMode::Video);
        assert!(guard.check_video(1.0).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(RunningMode::Image.to_string(), "IMAGE");
        assert_eq!(RunningMode::Video.to_string(), "VIDEO");
    }
}
