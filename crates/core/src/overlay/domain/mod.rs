pub mod overlay_element;
pub mod overlay_mapper;
pub mod overlay_renderer;
pub mod overlay_set;
