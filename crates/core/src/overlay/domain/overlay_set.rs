use crate::overlay::domain::overlay_element::{OverlayElement, OverlayId};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::shared::detection::Detection;
use crate::shared::screen_rect::ScreenRect;

/// The overlays currently attached to the renderer.
///
/// Always mirrors the most recent detection result: `replace` detaches
/// every previous overlay before attaching the new ones.
#[derive(Debug, Default)]
pub struct OverlaySet {
    elements: Vec<OverlayElement>,
    next_id: u64,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Detaches all current overlays and attaches one per detection.
    ///
    /// `placements` pairs index-wise with `detections`.
    pub fn replace(
        &mut self,
        detections: &[Detection],
        placements: &[ScreenRect],
        renderer: &mut dyn OverlayRenderer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        debug_assert_eq!(detections.len(), placements.len());
        self.clear(renderer)?;

        for (detection, placement) in detections.iter().zip(placements) {
            let element = OverlayElement::from_detection(self.allocate_id(), detection, *placement);
            renderer.create_overlay(&element)?;
            self.elements.push(element);
        }
        Ok(())
    }

    /// Moves every overlay to its new placement, index-wise.
    pub fn remap(
        &mut self,
        placements: &[ScreenRect],
        renderer: &mut dyn OverlayRenderer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        debug_assert_eq!(self.elements.len(), placements.len());
        for (element, placement) in self.elements.iter_mut().zip(placements) {
            element.placement = *placement;
            renderer.update_overlay(element)?;
        }
        Ok(())
    }

    /// Detaches every overlay. The set is empty afterwards even if the
    /// renderer reports an error.
    pub fn clear(&mut self, renderer: &mut dyn OverlayRenderer) -> Result<(), Box<dyn std::error::Error>> {
        let mut first_error = None;
        for element in self.elements.drain(..) {
            if let Err(e) = renderer.remove_overlay(element.id) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::detection::Category;
    use crate::shared::viewport::ViewportLayout;
    use std::collections::BTreeMap;

    /// Tracks attached overlays the way a display surface would.
    #[derive(Default)]
    struct RecordingRenderer {
        attached: BTreeMap<OverlayId, ScreenRect>,
        removed: Vec<OverlayId>,
        updates: usize,
        fail_remove: bool,
    }

    impl OverlayRenderer for RecordingRenderer {
        fn viewport_layout(&self) -> ViewportLayout {
            ViewportLayout::new(640.0, 480.0)
        }
        fn apply_full_window(&mut self, _full_window: bool) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
        fn set_window_size(&mut self, _w: u32, _h: u32) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
        fn create_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
            self.attached.insert(overlay.id, overlay.placement);
            Ok(())
        }
        fn update_overlay(&mut self, overlay: &OverlayElement) -> Result<(), Box<dyn std::error::Error>> {
            self.updates += 1;
            self.attached.insert(overlay.id, overlay.placement);
            Ok(())
        }
        fn remove_overlay(&mut self, id: OverlayId) -> Result<(), Box<dyn std::error::Error>> {
            self.attached.remove(&id);
            self.removed.push(id);
            if self.fail_remove {
                return Err("surface gone".into());
            }
            Ok(())
        }
    }

    fn detections(n: usize) -> (Vec<Detection>, Vec<ScreenRect>) {
        let dets = (0..n)
            .map(|i| {
                Detection::new(
                    BoundingBox::new(i as f64 * 10.0, 0.0, 5.0, 5.0),
                    vec![Category::new("cup", 0.5)],
                )
            })
            .collect();
        let rects = (0..n)
            .map(|i| ScreenRect::new(i as f64, 0.0, 5.0, 5.0))
            .collect();
        (dets, rects)
    }

    #[test]
    fn test_replace_attaches_one_overlay_per_detection() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(3);
        set.replace(&dets, &rects, &mut renderer).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(renderer.attached.len(), 3);
    }

    #[test]
    fn test_replace_leaves_no_stale_overlays() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(3);
        set.replace(&dets, &rects, &mut renderer).unwrap();
        let first_ids: Vec<_> = set.elements().iter().map(|e| e.id).collect();

        let (dets, rects) = detections(1);
        set.replace(&dets, &rects, &mut renderer).unwrap();

        assert_eq!(renderer.attached.len(), 1);
        assert_eq!(renderer.removed, first_ids);
        assert!(first_ids.iter().all(|id| !renderer.attached.contains_key(id)));
    }

    #[test]
    fn test_replace_with_nothing_clears() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(2);
        set.replace(&dets, &rects, &mut renderer).unwrap();
        set.replace(&[], &[], &mut renderer).unwrap();
        assert!(set.is_empty());
        assert!(renderer.attached.is_empty());
    }

    #[test]
    fn test_ids_are_unique_across_frames() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(2);
        set.replace(&dets, &rects, &mut renderer).unwrap();
        let a: Vec<_> = set.elements().iter().map(|e| e.id).collect();
        set.replace(&dets, &rects, &mut renderer).unwrap();
        let b: Vec<_> = set.elements().iter().map(|e| e.id).collect();
        assert!(a.iter().all(|id| !b.contains(id)));
    }

    #[test]
    fn test_remap_updates_placements() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(2);
        set.replace(&dets, &rects, &mut renderer).unwrap();

        let moved = vec![ScreenRect::new(100.0, 100.0, 1.0, 1.0), ScreenRect::new(200.0, 200.0, 1.0, 1.0)];
        set.remap(&moved, &mut renderer).unwrap();

        assert_eq!(renderer.updates, 2);
        assert_eq!(set.elements()[1].placement, moved[1]);
        assert_eq!(renderer.attached[&set.elements()[0].id], moved[0]);
    }

    #[test]
    fn test_clear_empties_set_even_on_error() {
        let mut renderer = RecordingRenderer::default();
        let mut set = OverlaySet::new();
        let (dets, rects) = detections(2);
        set.replace(&dets, &rects, &mut renderer).unwrap();

        renderer.fail_remove = true;
        assert!(set.clear(&mut renderer).is_err());
        assert!(set.is_empty());
        assert_eq!(renderer.removed.len(), 2);
    }
}
