use crate::shared::viewport::ViewportLayout;

/// Geometry of a video container that is either shown at its natural
/// (windowed) size or stretched to fill the whole window.
///
/// The container margins apply in both layouts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowLayout {
    window_width: u32,
    window_height: u32,
    windowed_width: u32,
    windowed_height: u32,
    margin_left: f64,
    margin_top: f64,
    full_window: bool,
}

impl WindowLayout {
    pub fn new(window_width: u32, window_height: u32, windowed_width: u32, windowed_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            windowed_width,
            windowed_height,
            margin_left: 0.0,
            margin_top: 0.0,
            full_window: false,
        }
    }

    pub fn with_margins(mut self, margin_left: f64, margin_top: f64) -> Self {
        self.margin_left = margin_left;
        self.margin_top = margin_top;
        self
    }

    pub fn is_full_window(&self) -> bool {
        self.full_window
    }

    pub fn set_full_window(&mut self, full_window: bool) {
        self.full_window = full_window;
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
        if width == 0 || height == 0 {
            return Err(format!("invalid window size {width}x{height}").into());
        }
        self.window_width = width;
        self.window_height = height;
        Ok(())
    }

    /// Element size and margins for the active layout.
    pub fn viewport_layout(&self) -> ViewportLayout {
        let (width, height) = if self.full_window {
            (self.window_width as f64, self.window_height as f64)
        } else {
            (
                self.windowed_width as f64 + self.margin_left * 2.0,
                self.windowed_height as f64 + self.margin_top * 2.0,
            )
        };
        ViewportLayout::new(width, height).with_margins(self.margin_left, self.margin_top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_windowed_layout_wraps_content_in_margins() {
        let layout = WindowLayout::new(1920, 1080, 640, 480).with_margins(10.0, 5.0);
        let v = layout.viewport_layout();
        assert_relative_eq!(v.element_width, 660.0);
        assert_relative_eq!(v.element_height, 490.0);
        assert_relative_eq!(v.margin_left, 10.0);
    }

    #[test]
    fn test_full_window_fills_window() {
        let mut layout = WindowLayout::new(1920, 1080, 640, 480);
        layout.set_full_window(true);
        let v = layout.viewport_layout();
        assert_relative_eq!(v.element_width, 1920.0);
        assert_relative_eq!(v.element_height, 1080.0);
    }

    #[test]
    fn test_resize_only_affects_full_window() {
        let mut layout = WindowLayout::new(1920, 1080, 640, 480);
        layout.set_window_size(800, 600).unwrap();
        assert_relative_eq!(layout.viewport_layout().element_width, 640.0);
        layout.set_full_window(true);
        assert_relative_eq!(layout.viewport_layout().element_width, 800.0);
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let mut layout = WindowLayout::new(1920, 1080, 640, 480);
        assert!(layout.set_window_size(0, 600).is_err());
        assert_eq!(layout.window_size(), (1920, 1080));
    }
}
