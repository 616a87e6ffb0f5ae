//! Video-space to display-space transforms for overlay placement.
//!
//! The displayed video is mirrored horizontally, so a box's on-screen left
//! edge comes from its right edge in the source frame.
//!
//! Two placement policies exist. Fresh detections are placed inside the
//! container's content box (element size minus margins, shifted by the
//! margins). Overlays re-placed after a viewport change use the whole
//! element and account for letterboxing instead. The two are kept separate
//! on purpose; they are not interchangeable.

use crate::overlay::domain::overlay_element::OverlayElement;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::detection::Detection;
use crate::shared::error::LiveViewError;
use crate::shared::screen_rect::ScreenRect;
use crate::shared::viewport::ViewportGeometry;

/// Affine map from mirrored source-frame pixels to display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayTransform {
    pub video_width: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl OverlayTransform {
    /// Transform for freshly detected boxes: content box, margin offsets.
    pub fn for_detections(geometry: &ViewportGeometry) -> Result<Self, LiveViewError> {
        geometry.ensure_video_loaded()?;
        Ok(Self {
            video_width: geometry.video_width,
            scale_x: geometry.display_width() / geometry.video_width,
            scale_y: geometry.display_height() / geometry.video_height,
            offset_x: geometry.layout.margin_left,
            offset_y: geometry.layout.margin_top,
        })
    }

    /// Transform for re-placing existing overlays: full element, letterbox
    /// offset when the video is wider than the element.
    pub fn for_resize(geometry: &ViewportGeometry) -> Result<Self, LiveViewError> {
        geometry.ensure_video_loaded()?;
        let dw = geometry.layout.element_width;
        let dh = geometry.layout.element_height;
        let aspect = geometry.video_aspect_ratio();
        let display_aspect = dw / dh;

        let (scale_y, offset_y) = if aspect > display_aspect {
            (dw / geometry.video_width, (dh - dw / aspect) / 2.0)
        } else {
            (dh / geometry.video_height, 0.0)
        };

        Ok(Self {
            video_width: geometry.video_width,
            scale_x: dw / geometry.video_width,
            scale_y,
            offset_x: 0.0,
            offset_y,
        })
    }

    pub fn apply(&self, bbox: &BoundingBox) -> ScreenRect {
        let mirrored_x = self.video_width - bbox.origin_x - bbox.width;
        ScreenRect::new(
            mirrored_x * self.scale_x + self.offset_x,
            bbox.origin_y * self.scale_y + self.offset_y,
            bbox.width * self.scale_x,
            bbox.height * self.scale_y,
        )
    }
}

/// Places each detection in display space, in input order.
pub fn map_detections_to_screen(
    detections: &[Detection],
    geometry: &ViewportGeometry,
) -> Result<Vec<ScreenRect>, LiveViewError> {
    let transform = OverlayTransform::for_detections(geometry)?;
    Ok(detections
        .iter()
        .map(|d| transform.apply(&d.bounding_box))
        .collect())
}

/// Re-places existing overlays from their retained source boxes.
pub fn remap_on_resize(
    overlays: &[OverlayElement],
    geometry: &ViewportGeometry,
) -> Result<Vec<ScreenRect>, LiveViewError> {
    let transform = OverlayTransform::for_resize(geometry)?;
    Ok(overlays
        .iter()
        .map(|o| transform.apply(&o.source_box))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::domain::overlay_element::OverlayId;
    use crate::shared::detection::Category;
    use crate::shared::viewport::ViewportLayout;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection::new(BoundingBox::new(x, y, w, h), vec![Category::new("cup", 0.8)])
    }

    fn geometry(element: (f64, f64), margins: (f64, f64), video: (u32, u32)) -> ViewportGeometry {
        let layout = ViewportLayout::new(element.0, element.1).with_margins(margins.0, margins.1);
        ViewportGeometry::new(layout, video.0, video.1, false)
    }

    fn overlay(bbox: BoundingBox) -> OverlayElement {
        OverlayElement::from_detection(
            OverlayId(0),
            &Detection::new(bbox, vec![]),
            ScreenRect::new(0.0, 0.0, 0.0, 0.0),
        )
    }

    fn assert_rect(r: &ScreenRect, left: f64, top: f64, width: f64, height: f64) {
        assert_relative_eq!(r.left, left, epsilon = 1e-9);
        assert_relative_eq!(r.top, top, epsilon = 1e-9);
        assert_relative_eq!(r.width, width, epsilon = 1e-9);
        assert_relative_eq!(r.height, height, epsilon = 1e-9);
    }

    #[test]
    fn test_same_size_display_mirrors_horizontally() {
        let g = geometry((640.0, 480.0), (0.0, 0.0), (640, 480));
        let rects = map_detections_to_screen(&[detection(100.0, 50.0, 50.0, 40.0)], &g).unwrap();
        assert_eq!(rects.len(), 1);
        assert_rect(&rects[0], 490.0, 50.0, 50.0, 40.0);
    }

    #[test]
    fn test_wider_display_scales_horizontally() {
        let g = geometry((1280.0, 480.0), (0.0, 0.0), (640, 480));
        let rects = map_detections_to_screen(&[detection(100.0, 50.0, 50.0, 40.0)], &g).unwrap();
        assert_rect(&rects[0], 980.0, 50.0, 100.0, 40.0);
    }

    #[test]
    fn test_margins_shrink_display_and_offset() {
        // 700x520 element with 30/20 margins leaves a 640x480 content box
        let g = geometry((700.0, 520.0), (30.0, 20.0), (640, 480));
        let rects = map_detections_to_screen(&[detection(100.0, 50.0, 50.0, 40.0)], &g).unwrap();
        assert_rect(&rects[0], 520.0, 70.0, 50.0, 40.0);
    }

    #[rstest]
    #[case((640.0, 480.0), (0.0, 0.0), (100.0, 50.0, 50.0, 40.0))]
    #[case((1280.0, 720.0), (8.0, 8.0), (0.0, 0.0, 640.0, 480.0))]
    #[case((320.0, 240.0), (4.0, 2.0), (600.0, 10.0, 40.0, 400.0))]
    fn test_mirroring_identity(
        #[case] element: (f64, f64),
        #[case] margins: (f64, f64),
        #[case] bbox: (f64, f64, f64, f64),
    ) {
        let g = geometry(element, margins, (640, 480));
        let (x, y, w, h) = bbox;
        let rect = map_detections_to_screen(&[detection(x, y, w, h)], &g).unwrap()[0];
        let scale_x = g.display_width() / 640.0;

        assert_relative_eq!(rect.right(), (640.0 - x) * scale_x + margins.0, epsilon = 1e-9);
        assert_relative_eq!(
            rect.left,
            (640.0 - x - w) * scale_x + margins.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_mapping_is_pure() {
        let g = geometry((900.0, 700.0), (12.0, 6.0), (1280, 720));
        let detections = vec![detection(10.0, 20.0, 30.0, 40.0), detection(500.0, 100.0, 200.0, 300.0)];
        let first = map_detections_to_screen(&detections, &g).unwrap();
        let second = map_detections_to_screen(&detections, &g).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_preserves_order() {
        let g = geometry((640.0, 480.0), (0.0, 0.0), (640, 480));
        let rects = map_detections_to_screen(
            &[detection(0.0, 0.0, 10.0, 10.0), detection(300.0, 0.0, 10.0, 10.0)],
            &g,
        )
        .unwrap();
        assert_relative_eq!(rects[0].left, 630.0);
        assert_relative_eq!(rects[1].left, 330.0);
    }

    #[test]
    fn test_empty_detections() {
        let g = geometry((640.0, 480.0), (0.0, 0.0), (640, 480));
        assert!(map_detections_to_screen(&[], &g).unwrap().is_empty());
    }

    #[rstest]
    #[case((0, 480))]
    #[case((640, 0))]
    fn test_unloaded_video_is_rejected(#[case] video: (u32, u32)) {
        let g = geometry((640.0, 480.0), (0.0, 0.0), video);
        assert!(matches!(
            map_detections_to_screen(&[detection(1.0, 1.0, 1.0, 1.0)], &g),
            Err(LiveViewError::VideoNotLoaded { .. })
        ));
        assert!(matches!(
            remap_on_resize(&[], &g),
            Err(LiveViewError::VideoNotLoaded { .. })
        ));
    }

    #[test]
    fn test_remap_wide_video_letterboxes_vertically() {
        // 16:9 video in a square element: 800/1280 scale, (800 - 450) / 2 offset
        let g = geometry((800.0, 800.0), (0.0, 0.0), (1280, 720));
        let rects = remap_on_resize(&[overlay(BoundingBox::new(0.0, 0.0, 1280.0, 720.0))], &g).unwrap();
        assert_rect(&rects[0], 0.0, 175.0, 800.0, 450.0);
    }

    #[test]
    fn test_remap_narrow_video_has_no_offset() {
        // 4:3 video in a 16:9 element
        let g = geometry((1280.0, 720.0), (0.0, 0.0), (640, 480));
        let rects = remap_on_resize(&[overlay(BoundingBox::new(100.0, 50.0, 50.0, 40.0))], &g).unwrap();
        assert_rect(&rects[0], 980.0, 75.0, 100.0, 60.0);
    }

    #[test]
    fn test_remap_ignores_margins() {
        let with = geometry((800.0, 800.0), (20.0, 20.0), (1280, 720));
        let without = geometry((800.0, 800.0), (0.0, 0.0), (1280, 720));
        let overlays = [overlay(BoundingBox::new(64.0, 36.0, 128.0, 72.0))];
        assert_eq!(
            remap_on_resize(&overlays, &with).unwrap(),
            remap_on_resize(&overlays, &without).unwrap()
        );
    }

    #[test]
    fn test_remap_uses_source_box_not_placement() {
        let g = geometry((640.0, 480.0), (0.0, 0.0), (640, 480));
        let mut o = overlay(BoundingBox::new(100.0, 50.0, 50.0, 40.0));
        o.placement = ScreenRect::new(1.0, 2.0, 3.0, 4.0);
        let rects = remap_on_resize(&[o], &g).unwrap();
        assert_rect(&rects[0], 490.0, 50.0, 50.0, 40.0);
    }

    #[test]
    fn test_policies_differ_with_margins() {
        let g = geometry((700.0, 520.0), (30.0, 20.0), (640, 480));
        let bbox = BoundingBox::new(100.0, 50.0, 50.0, 40.0);
        let fresh = OverlayTransform::for_detections(&g).unwrap().apply(&bbox);
        let remapped = OverlayTransform::for_resize(&g).unwrap().apply(&bbox);
        assert_ne!(fresh, remapped);
    }
}
