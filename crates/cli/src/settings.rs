use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use liveview_core::detection::domain::detector_options::Delegate;
use liveview_core::shared::constants::{
    DEFAULT_CAMERA_DEVICE, DEFAULT_MODEL_NAME, DEFAULT_REFRESH_HZ, DEFAULT_SCORE_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DelegateSetting {
    Cpu,
    Gpu,
}

impl From<DelegateSetting> for Delegate {
    fn from(d: DelegateSetting) -> Self {
        match d {
            DelegateSetting::Cpu => Delegate::Cpu,
            DelegateSetting::Gpu => Delegate::Gpu,
        }
    }
}

/// Persistent defaults for the live view. Command-line flags override
/// whatever is stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub model_url: Option<String>,
    pub labels: Option<PathBuf>,
    pub device: String,
    pub input_format: Option<String>,
    pub capture_size: Option<(u32, u32)>,
    pub frame_rate: Option<u32>,
    pub score_threshold: f32,
    pub max_results: Option<usize>,
    pub category_allowlist: Vec<String>,
    pub category_denylist: Vec<String>,
    pub delegate: DelegateSetting,
    pub refresh_hz: f64,
    /// Size of the video element outside full-window mode.
    pub view_size: (u32, u32),
    /// Size of the whole window, used in full-window mode.
    pub window_size: (u32, u32),
    pub margin_left: f64,
    pub margin_top: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_NAME.to_string(),
            model_url: None,
            labels: None,
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            input_format: None,
            capture_size: None,
            frame_rate: None,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_results: None,
            category_allowlist: Vec::new(),
            category_denylist: Vec::new(),
            delegate: DelegateSetting::Gpu,
            refresh_hz: DEFAULT_REFRESH_HZ,
            view_size: (640, 480),
            window_size: (1280, 720),
            margin_left: 0.0,
            margin_top: 0.0,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("LiveView").join("settings.json"))
    }

    /// Stored settings, or defaults when there are none or they don't parse.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(format!(
                "Score threshold must be between 0.0 and 1.0, got {}",
                self.score_threshold
            )
            .into());
        }
        if !(self.refresh_hz.is_finite() && self.refresh_hz > 0.0) {
            return Err(format!("Refresh rate must be positive, got {}", self.refresh_hz).into());
        }
        for (name, (w, h)) in [("View", self.view_size), ("Window", self.window_size)] {
            if w == 0 || h == 0 {
                return Err(format!("{name} size must be non-zero, got {w}x{h}").into());
            }
        }
        if let Some((w, h)) = self.capture_size {
            if w == 0 || h == 0 {
                return Err(format!("Capture size must be non-zero, got {w}x{h}").into());
            }
        }
        if self.margin_left < 0.0 || self.margin_top < 0.0 {
            return Err("Margins must not be negative".into());
        }
        if self.margin_left * 2.0 >= self.view_size.0 as f64
            || self.margin_top * 2.0 >= self.view_size.1 as f64
        {
            return Err("Margins leave no room for the video".into());
        }
        if self.max_results == Some(0) {
            return Err("Max results must be at least 1".into());
        }
        if self.frame_rate == Some(0) {
            return Err("Frame rate must be at least 1".into());
        }
        Ok(())
    }
}
