use crate::shared::error::LiveViewError;

/// On-screen size of the video element and its container margins.
///
/// Supplied by the renderer; changes when the window is resized or the
/// full-window mode is toggled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportLayout {
    /// Rendered element width, container margins included.
    pub element_width: f64,
    /// Rendered element height, container margins included.
    pub element_height: f64,
    pub margin_left: f64,
    pub margin_top: f64,
}

impl ViewportLayout {
    pub fn new(element_width: f64, element_height: f64) -> Self {
        Self {
            element_width,
            element_height,
            margin_left: 0.0,
            margin_top: 0.0,
        }
    }

    pub fn with_margins(mut self, margin_left: f64, margin_top: f64) -> Self {
        self.margin_left = margin_left;
        self.margin_top = margin_top;
        self
    }
}

/// Everything the overlay mapper reads at transform time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportGeometry {
    pub layout: ViewportLayout,
    /// Intrinsic width of the camera video.
    pub video_width: f64,
    /// Intrinsic height of the camera video.
    pub video_height: f64,
    pub full_window: bool,
}

impl ViewportGeometry {
    pub fn new(layout: ViewportLayout, video_width: u32, video_height: u32, full_window: bool) -> Self {
        Self {
            layout,
            video_width: video_width as f64,
            video_height: video_height as f64,
            full_window,
        }
    }

    /// Content width: element width minus the container margin on both sides.
    pub fn display_width(&self) -> f64 {
        self.layout.element_width - self.layout.margin_left * 2.0
    }

    /// Content height: element height minus the container margin on both sides.
    pub fn display_height(&self) -> f64 {
        self.layout.element_height - self.layout.margin_top * 2.0
    }

    /// Intrinsic aspect ratio of the video.
    pub fn video_aspect_ratio(&self) -> f64 {
        self.video_width / self.video_height
    }

    /// Fails until the video's intrinsic dimensions are known.
    pub fn ensure_video_loaded(&self) -> Result<(), LiveViewError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.video_width) && valid(self.video_height) {
            Ok(())
        } else {
            Err(LiveViewError::VideoNotLoaded {
                width: self.video_width,
                height: self.video_height,
            })
        }
    }
}
