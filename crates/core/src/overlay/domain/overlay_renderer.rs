use crate::overlay::domain::overlay_element::{OverlayElement, OverlayId};
use crate::shared::frame::Frame;
use crate::shared::viewport::ViewportLayout;

/// Domain interface for the surface that shows the video and its overlays.
pub trait OverlayRenderer: Send {
    /// Current on-screen size of the video element and container margins.
    fn viewport_layout(&self) -> ViewportLayout;

    /// Switches the video container between its windowed and full-window
    /// layouts.
    fn apply_full_window(&mut self, full_window: bool) -> Result<(), Box<dyn std::error::Error>>;

    /// Reports a new window size.
    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>>;

    fn create_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>>;

    /// Moves an existing overlay to `overlay.placement`.
    fn update_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>>;

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), Box<dyn std::error::Error>>;

    /// Shows `frame` under the currently attached overlays. Default: no-op.
    fn present(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
