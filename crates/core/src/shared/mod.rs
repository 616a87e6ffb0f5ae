pub mod bounding_box;
pub mod constants;
pub mod detection;
pub mod error;
pub mod frame;
pub mod screen_rect;
pub mod viewport;
