use std::path::PathBuf;

use crate::detection::domain::object_detector::RunningMode;
use crate::shared::constants::DEFAULT_SCORE_THRESHOLD;
use crate::shared::detection::Detection;

/// Where inference should run. `Gpu` falls back to CPU on platforms
/// without an accelerated execution provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delegate {
    Cpu,
    Gpu,
}

/// Construction-time configuration of an object detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub model_path: PathBuf,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    pub score_threshold: f32,
    /// Keep at most this many detections, best first. `None` keeps all.
    pub max_results: Option<usize>,
    /// When non-empty, only these category names are reported.
    pub category_allowlist: Vec<String>,
    /// Category names never reported. Ignored when an allowlist is set.
    pub category_denylist: Vec<String>,
}

impl DetectorOptions {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Image,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_results: None,
            category_allowlist: Vec::new(),
            category_denylist: Vec::new(),
        }
    }

    /// Filters raw detections by score and category lists, ranks them by
    /// score and truncates to `max_results`.
    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut kept: Vec<Detection> = detections
            .into_iter()
            .filter(|d| d.score() >= self.score_threshold)
            .filter(|d| self.category_permitted(d))
            .collect();
        kept.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(max) = self.max_results {
            kept.truncate(max);
        }
        kept
    }

    fn category_permitted(&self, detection: &Detection) -> bool {
        let Some(category) = detection.top_category() else {
            return self.category_allowlist.is_empty();
        };
        let name = category.category_name.as_str();
        if !self.category_allowlist.is_empty() {
            self.category_allowlist.iter().any(|c| c.eq_ignore_ascii_case(name))
        } else {
            !self.category_denylist.iter().any(|c| c.eq_ignore_ascii_case(name))
        }
    }
}
