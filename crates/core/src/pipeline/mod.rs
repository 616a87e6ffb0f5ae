pub mod detector_slot;
pub mod frame_loop_driver;
pub mod frame_loop_logger;
pub mod live_view;
pub mod refresh_loop;
