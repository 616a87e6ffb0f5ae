pub mod log_overlay_renderer;
pub mod snapshot_overlay_renderer;
pub mod window_layout;
