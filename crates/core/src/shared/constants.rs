/// Default model file looked up in the cache and bundled directories.
pub const DEFAULT_MODEL_NAME: &str = "yolo11n.onnx";

/// Detections scoring below this are dropped before rendering.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.2;

/// Display refresh rate the frame loop is scheduled at.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Category that gets the person highlight style.
pub const PERSON_CATEGORY: &str = "person";

pub const MUTE_CAPTION: &str = "MUTE";
pub const UNMUTE_CAPTION: &str = "UNMUTE";
