use thiserror::Error;

/// Failures of the live-view flow.
///
/// None of these is fatal to the process: a failed tick simply draws no
/// overlays for that frame.
#[derive(Error, Debug)]
pub enum LiveViewError {
    #[error("camera access denied: {0}")]
    CameraAccessDenied(String),
    #[error("object detector is not loaded yet")]
    DetectorNotReady,
    #[error("object detector failed to load: {0}")]
    DetectorLoadFailed(String),
    #[error("video dimensions not known yet ({width}x{height})")]
    VideoNotLoaded { width: f64, height: f64 },
    #[error("camera is not enabled")]
    CameraNotEnabled,
    #[error("detection failed: {0}")]
    Detector(String),
    #[error("overlay rendering failed: {0}")]
    Render(String),
    #[error("camera stream failed: {0}")]
    Camera(String),
}
