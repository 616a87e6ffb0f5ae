use std::collections::HashMap;
use std::time::Instant;

/// Per-tick outcome counted by the frame loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// A new frame was detected and rendered.
    Processed,
    /// The stream's playback time had not advanced.
    Duplicate,
    /// The stream had no frame to hand out yet.
    NoFrame,
    /// The detector was still loading.
    NotReady,
    /// The tick failed; nothing was drawn.
    Failed,
}

/// Cross-cutting logger for frame loop events.
///
/// Decouples the live view controller from specific output mechanisms so
/// tests and the CLI can observe the loop without changing it.
pub trait FrameLoopLogger: Send {
    /// Count one refresh tick.
    fn tick(&mut self, kind: TickKind);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. overlay count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullFrameLoopLogger;

impl FrameLoopLogger for NullFrameLoopLogger {
    fn tick(&mut self, _kind: TickKind) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one series of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl Aggregate {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// CLI-oriented logger that tracks stage timings, metrics and tick
/// counts, and reports a summary when the loop ends.
///
/// Progress output is throttled to every `throttle_frames` processed
/// frames.
pub struct StdoutFrameLoopLogger {
    throttle_frames: usize,
    timings: HashMap<String, Aggregate>,
    metrics: HashMap<String, Aggregate>,
    ticks: HashMap<TickKind, usize>,
    start_time: Instant,
}

impl StdoutFrameLoopLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            ticks: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn count(&self, kind: TickKind) -> usize {
        self.ticks.get(&kind).copied().unwrap_or(0)
    }

    /// Returns the formatted summary string, or `None` if no frame was
    /// processed.
    pub fn summary_string(&self) -> Option<String> {
        let frames = self.count(TickKind::Processed);
        if frames == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Live view summary ({frames} frames, {} duplicate ticks, {} without frame, {} not ready, {} failed, {:.1}s):",
            self.count(TickKind::Duplicate),
            self.count(TickKind::NoFrame),
            self.count(TickKind::NotReady),
            self.count(TickKind::Failed),
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms = durations.sum;
            let avg_ms = durations.average();
            let max_ms = durations.max;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].average()));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Detection rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&Aggregate> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&Aggregate> {
        self.metrics.get(name)
    }
}

impl Default for StdoutFrameLoopLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FrameLoopLogger for StdoutFrameLoopLogger {
    fn tick(&mut self, kind: TickKind) {
        let count = self.ticks.entry(kind).or_default();
        *count += 1;
        if kind == TickKind::Processed && *count % self.throttle_frames == 0 {
            log::info!("Processed {count} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
