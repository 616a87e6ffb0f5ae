use thiserror::Error;

use crate::shared::error::LiveViewError;
use crate::shared::frame::Frame;

/// What to capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConstraints {
    /// Device path or URL, e.g. `/dev/video0`.
    pub device: String,
    /// Capture backend name (e.g. `v4l2`, `avfoundation`). `None` lets the
    /// source probe the device.
    pub input_format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    /// Deliver frames no faster than their timestamps (for recorded sources).
    pub realtime: bool,
}

impl CameraConstraints {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            input_format: None,
            width: None,
            height: None,
            frame_rate: None,
            realtime: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera capture is not supported: {0}")]
    NotSupported(String),
    #[error("permission to open {device} was denied")]
    PermissionDenied { device: String },
    #[error("failed to open camera {device}: {reason}")]
    Open { device: String, reason: String },
}

impl From<CameraError> for LiveViewError {
    fn from(e: CameraError) -> Self {
        LiveViewError::CameraAccessDenied(e.to_string())
    }
}

/// Acquires camera streams.
pub trait CameraSource {
    /// Whether this source can capture at all on the current platform.
    fn is_supported(&self) -> bool;

    fn request_stream(
        &mut self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live stream of frames attached to the display.
///
/// `current_time` advances independently of the consumer; a consumer that
/// polls faster than the camera produces frames sees the same time twice.
pub trait CameraStream: Send {
    /// Intrinsic frame size, `None` until the first frame has been decoded.
    fn video_size(&self) -> Option<(u32, u32)>;

    /// Playback position in seconds of the newest available frame, `None`
    /// before the first frame.
    fn current_time(&mut self) -> Option<f64>;

    /// The newest available frame.
    fn current_frame(&self) -> Option<&Frame>;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// True once the source has delivered its last frame.
    fn is_ended(&self) -> bool;

    /// Releases the device. Idempotent.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_defaults() {
        let c = CameraConstraints::new("/dev/video0");
        assert_eq!(c.device, "/dev/video0");
        assert!(c.input_format.is_none());
        assert!(!c.realtime);
    }

    #[test]
    fn test_camera_errors_become_access_denied() {
        let e: LiveViewError = CameraError::PermissionDenied {
            device: "/dev/video0".into(),
        }
        .into();
        assert!(matches!(e, LiveViewError::CameraAccessDenied(ref m) if m.contains("/dev/video0")));
    }
}
