pub mod detector_options;
pub mod object_detector;
