use std::collections::BTreeMap;

use crate::overlay::domain::overlay_element::{OverlayElement, OverlayId};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::infrastructure::window_layout::WindowLayout;
use crate::shared::frame::Frame;
use crate::shared::viewport::ViewportLayout;

/// Headless renderer that keeps overlays in memory and reports them
/// through the `log` crate.
pub struct LogOverlayRenderer {
    layout: WindowLayout,
    attached: BTreeMap<OverlayId, OverlayElement>,
}

impl LogOverlayRenderer {
    pub fn new(layout: WindowLayout) -> Self {
        Self {
            layout,
            attached: BTreeMap::new(),
        }
    }

    /// Overlays currently attached, ordered by id.
    pub fn attached(&self) -> impl Iterator<Item = &OverlayElement> {
        self.attached.values()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }
}

impl OverlayRenderer for LogOverlayRenderer {
    fn viewport_layout(&self) -> ViewportLayout {
        self.layout.viewport_layout()
    }

    fn apply_full_window(&mut self, full_window: bool) -> Result<(), Box<dyn std::error::Error>> {
        self.layout.set_full_window(full_window);
        log::info!("Layout: {}", if full_window { "full window" } else { "windowed" });
        Ok(())
    }

    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.layout.set_window_size(width, height)?;
        log::debug!("Window resized to {width}x{height}");
        Ok(())
    }

    fn create_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
        self.attached.insert(overlay.id, overlay.clone());
        Ok(())
    }

    fn update_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
        let existing = self
            .attached
            .get_mut(&overlay.id)
            .ok_or_else(|| format!("overlay {} is not attached", overlay.id))?;
        existing.placement = overlay.placement;
        Ok(())
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), Box<dyn std::error::Error>> {
        self.attached.remove(&id);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!(
            "Frame {} @ {:.3}s: {} overlays",
            frame.index(),
            frame.timestamp(),
            self.attached.len()
        );
        for overlay in self.attached.values() {
            let r = overlay.placement;
            let (ax, ay) = r.label_anchor();
            log::debug!(
                "  {} [{:.0},{:.0} {:.0}x{:.0}] label at ({ax:.0},{ay:.0})",
                overlay.label,
                r.left,
                r.top,
                r.width,
                r.height
            );
        }
        Ok(())
    }
}
