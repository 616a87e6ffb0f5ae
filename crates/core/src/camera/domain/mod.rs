pub mod camera_source;
pub mod camera_session;
