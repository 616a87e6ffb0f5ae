/// Axis-aligned box in source-frame pixel space.
///
/// Origin is the top-left corner of the unmirrored camera frame, the same
/// space the detector reports in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Builds a box from `(x1, y1, x2, y2)` corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> f64 {
        self.origin_x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin_y + self.height
    }

    /// Clips the box to `[0, frame_width] x [0, frame_height]`.
    ///
    /// A box entirely outside the frame collapses to zero size at the edge.
    pub fn clamp_to(&self, frame_width: f64, frame_height: f64) -> Self {
        let x1 = self.origin_x.clamp(0.0, frame_width);
        let y1 = self.origin_y.clamp(0.0, frame_height);
        let x2 = self.right().clamp(0.0, frame_width);
        let y2 = self.bottom().clamp(0.0, frame_height);
        Self::from_corners(x1, y1, x2.max(x1), y2.max(y1))
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.origin_x.max(other.origin_x);
        let iy1 = self.origin_y.max(other.origin_y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width * self.height;
        let area_b = other.width * other.height;
        inter / (area_a + area_b - inter)
    }
}
