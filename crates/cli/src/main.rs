mod commands;
mod settings;

use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use liveview_core::camera::domain::camera_source::CameraConstraints;
use liveview_core::camera::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use liveview_core::detection::domain::detector_options::DetectorOptions;
use liveview_core::detection::domain::object_detector::ObjectDetector;
use liveview_core::detection::infrastructure::coco_labels::parse_labels;
use liveview_core::detection::infrastructure::model_resolver;
use liveview_core::detection::infrastructure::onnx_object_detector::OnnxObjectDetector;
use liveview_core::overlay::domain::overlay_renderer::OverlayRenderer;
use liveview_core::overlay::infrastructure::log_overlay_renderer::LogOverlayRenderer;
use liveview_core::overlay::infrastructure::snapshot_overlay_renderer::SnapshotOverlayRenderer;
use liveview_core::overlay::infrastructure::window_layout::WindowLayout;
use liveview_core::pipeline::detector_slot::DetectorSlot;
use liveview_core::pipeline::frame_loop_driver::{FrameLoopDriver, FrameOutcome};
use liveview_core::pipeline::frame_loop_logger::StdoutFrameLoopLogger;
use liveview_core::pipeline::live_view::LiveView;
use liveview_core::pipeline::refresh_loop::RefreshLoop;
use liveview_core::shared::error::LiveViewError;

use commands::{parse_size, Command, HELP};
use settings::{DelegateSetting, Settings};

/// Live camera object detection with on-screen overlays.
///
/// Values not given on the command line come from the saved settings file.
#[derive(Parser, Debug)]
#[command(name = "liveview")]
struct Cli {
    /// Model file path, or a file name looked up in the model cache.
    #[arg(long)]
    model: Option<String>,

    /// URL to download the model from when it isn't cached.
    #[arg(long)]
    model_url: Option<String>,

    /// Directory with pre-packaged models.
    #[arg(long)]
    bundled_models: Option<PathBuf>,

    /// Category names file, one per line, indexed by class id.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Camera device path or URL.
    #[arg(long)]
    device: Option<String>,

    /// Capture backend (e.g. v4l2, avfoundation).
    #[arg(long)]
    input_format: Option<String>,

    /// Requested capture size, WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    capture_size: Option<(u32, u32)>,

    /// Requested capture frame rate.
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Pace recorded sources to their timestamps.
    #[arg(long)]
    realtime: bool,

    /// Minimum detection score (0.0-1.0).
    #[arg(long)]
    score_threshold: Option<f32>,

    /// Keep at most this many detections per frame.
    #[arg(long)]
    max_results: Option<usize>,

    /// Only report these categories (comma-separated).
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,

    /// Never report these categories (comma-separated).
    #[arg(long, value_delimiter = ',')]
    deny: Option<Vec<String>>,

    /// Inference delegate.
    #[arg(long, value_enum)]
    delegate: Option<DelegateSetting>,

    /// Display refresh rate in Hz.
    #[arg(long)]
    refresh_hz: Option<f64>,

    /// Video element size outside full window, WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    view_size: Option<(u32, u32)>,

    /// Window size, WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    window_size: Option<(u32, u32)>,

    /// Container margin on the left and right.
    #[arg(long)]
    margin_left: Option<f64>,

    /// Container margin on the top and bottom.
    #[arg(long)]
    margin_top: Option<f64>,

    /// Start in full-window mode.
    #[arg(long)]
    full_window: bool,

    /// Write composed frames as PNG files to this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Write every Nth presented frame.
    #[arg(long, default_value = "30")]
    snapshot_every: usize,

    /// Stop after this many detected frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Store the effective settings as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = merge_settings(Settings::load(), &cli);
    validate(&cli, &settings)?;

    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Saved settings to {}", path.display());
    }

    let slot = spawn_detector(&settings, cli.bundled_models.clone());
    let renderer = build_renderer(&cli, &settings);
    let mut view = LiveView::new(
        FrameLoopDriver::new(slot),
        renderer,
        Box::new(StdoutFrameLoopLogger::default()),
    );
    if cli.full_window {
        view.toggle_full_window()?;
    }

    let mut source = FfmpegCameraSource::new();
    let constraints = camera_constraints(&cli, &settings);
    let commands = commands::spawn_reader(io::BufReader::new(io::stdin()));
    log::info!("{HELP}");

    let refresh = RefreshLoop::new(settings.refresh_hz);
    let mut detected_frames = 0usize;
    let mut failure: Option<LiveViewError> = None;

    refresh.run(|| {
        for command in commands.try_iter() {
            if handle_command(&mut view, command).is_break() {
                return ControlFlow::Break(());
            }
        }

        if !view.is_camera_enabled() {
            match view.detector_status() {
                Ok(()) => {
                    if let Err(e) = view.enable_camera(&mut source, &constraints) {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                }
                Err(LiveViewError::DetectorNotReady) => return ControlFlow::Continue(()),
                Err(e) => {
                    failure = Some(e);
                    return ControlFlow::Break(());
                }
            }
        }

        match view.on_frame_ready() {
            Ok(FrameOutcome::Detected { .. }) => {
                detected_frames += 1;
                if cli.max_frames.is_some_and(|max| detected_frames >= max) {
                    return ControlFlow::Break(());
                }
            }
            Ok(_) | Err(LiveViewError::DetectorNotReady) => {}
            Err(e) => log::warn!("Frame skipped: {e}"),
        }

        if view.is_stream_ended() {
            log::info!("Camera stream ended");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    view.shutdown();
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn handle_command(view: &mut LiveView, command: Command) -> ControlFlow<()> {
    let result = match command {
        Command::Quit => return ControlFlow::Break(()),
        Command::FullWindow => view.toggle_full_window().map(|full| {
            log::info!("Full window: {}", if full { "on" } else { "off" });
        }),
        Command::Mute => view.toggle_mute().map(|caption| {
            log::info!("Mute button: {caption}");
        }),
        Command::Resize(w, h) => view.on_resize(w, h),
    };
    if let Err(e) = result {
        log::warn!("{e}");
    }
    ControlFlow::Continue(())
}

/// Applies command-line overrides on top of stored settings.
fn merge_settings(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if cli.model_url.is_some() {
        settings.model_url = cli.model_url.clone();
    }
    if cli.labels.is_some() {
        settings.labels = cli.labels.clone();
    }
    if let Some(device) = &cli.device {
        settings.device = device.clone();
    }
    if cli.input_format.is_some() {
        settings.input_format = cli.input_format.clone();
    }
    if cli.capture_size.is_some() {
        settings.capture_size = cli.capture_size;
    }
    if cli.frame_rate.is_some() {
        settings.frame_rate = cli.frame_rate;
    }
    if let Some(threshold) = cli.score_threshold {
        settings.score_threshold = threshold;
    }
    if cli.max_results.is_some() {
        settings.max_results = cli.max_results;
    }
    if let Some(allow) = &cli.allow {
        settings.category_allowlist = allow.clone();
    }
    if let Some(deny) = &cli.deny {
        settings.category_denylist = deny.clone();
    }
    if let Some(delegate) = cli.delegate {
        settings.delegate = delegate;
    }
    if let Some(hz) = cli.refresh_hz {
        settings.refresh_hz = hz;
    }
    if let Some(size) = cli.view_size {
        settings.view_size = size;
    }
    if let Some(size) = cli.window_size {
        settings.window_size = size;
    }
    if let Some(margin) = cli.margin_left {
        settings.margin_left = margin;
    }
    if let Some(margin) = cli.margin_top {
        settings.margin_top = margin;
    }
    settings
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    settings.validate()?;
    if cli.snapshot_every == 0 {
        return Err("Snapshot interval must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if let Some(labels) = &settings.labels {
        if !labels.is_file() {
            return Err(format!("Labels file not found: {}", labels.display()).into());
        }
    }
    Ok(())
}

fn camera_constraints(cli: &Cli, settings: &Settings) -> CameraConstraints {
    let mut constraints = CameraConstraints::new(settings.device.clone());
    constraints.input_format = settings.input_format.clone();
    constraints.width = settings.capture_size.map(|(w, _)| w);
    constraints.height = settings.capture_size.map(|(_, h)| h);
    constraints.frame_rate = settings.frame_rate;
    constraints.realtime = cli.realtime;
    constraints
}

fn build_renderer(cli: &Cli, settings: &Settings) -> Box<dyn OverlayRenderer> {
    let (window_w, window_h) = settings.window_size;
    let (view_w, view_h) = settings.view_size;
    let layout = WindowLayout::new(window_w, window_h, view_w, view_h)
        .with_margins(settings.margin_left, settings.margin_top);

    match &cli.snapshot_dir {
        Some(dir) => Box::new(SnapshotOverlayRenderer::new(layout, dir, cli.snapshot_every)),
        None => Box::new(LogOverlayRenderer::new(layout)),
    }
}

/// Resolves and loads the model on a background thread.
fn spawn_detector(settings: &Settings, bundled_dir: Option<PathBuf>) -> DetectorSlot {
    let mut options = DetectorOptions::new(PathBuf::new());
    options.delegate = settings.delegate.into();
    options.score_threshold = settings.score_threshold;
    options.max_results = settings.max_results;
    options.category_allowlist = settings.category_allowlist.clone();
    options.category_denylist = settings.category_denylist.clone();

    let model = settings.model.clone();
    let model_url = settings.model_url.clone();
    let labels = settings.labels.clone();

    DetectorSlot::spawn_loader(move || {
        log::info!("Resolving model: {model}");
        options.model_path = model_resolver::resolve(
            &model,
            model_url.as_deref(),
            bundled_dir.as_deref(),
            Some(Box::new(download_progress)),
        )?;
        let mut detector = OnnxObjectDetector::create_from_options(options)?;
        if let Some(path) = labels {
            detector = detector.with_labels(read_labels(&path)?);
        }
        Ok(Box::new(detector) as Box<dyn ObjectDetector>)
    })
}

fn read_labels(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let labels = parse_labels(&std::fs::read_to_string(path)?);
    if labels.is_empty() {
        return Err(format!("Labels file is empty: {}", path.display()).into());
    }
    Ok(labels)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading object detection model... {pct}%");
    } else {
        eprint!("\rDownloading object detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "liveview",
            "--score-threshold",
            "0.7",
            "--deny",
            "chair,couch",
            "--delegate",
            "cpu",
            "--window-size",
            "800x600",
        ]);
        let merged = merge_settings(Settings::default(), &cli);
        assert_eq!(merged.score_threshold, 0.7);
        assert_eq!(merged.category_denylist, vec!["chair", "couch"]);
        assert_eq!(merged.delegate, DelegateSetting::Cpu);
        assert_eq!(merged.window_size, (800, 600));
        assert_eq!(merged.view_size, Settings::default().view_size);
    }

    #[test]
    fn test_stored_settings_survive_without_flags() {
        let mut stored = Settings::default();
        stored.device = "/dev/video2".into();
        stored.margin_left = 8.0;
        let merged = merge_settings(stored.clone(), &Cli::parse_from(["liveview"]));
        assert_eq!(merged, stored);
    }

    #[test]
    fn test_bad_size_flag_is_rejected() {
        assert!(Cli::try_parse_from(["liveview", "--view-size", "640"]).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_snapshot_interval() {
        let cli = Cli::parse_from(["liveview", "--snapshot-every", "0"]);
        assert!(validate(&cli, &Settings::default()).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_labels_file() {
        let cli = Cli::parse_from(["liveview", "--labels", "/nonexistent/labels.txt"]);
        let settings = merge_settings(Settings::default(), &cli);
        assert!(validate(&cli, &settings).is_err());
    }

    #[test]
    fn test_camera_constraints_from_settings() {
        let cli = Cli::parse_from([
            "liveview",
            "--device",
            "/dev/video3",
            "--capture-size",
            "1280x720",
            "--realtime",
        ]);
        let settings = merge_settings(Settings::default(), &cli);
        let constraints = camera_constraints(&cli, &settings);
        assert_eq!(constraints.device, "/dev/video3");
        assert_eq!((constraints.width, constraints.height), (Some(1280), Some(720)));
        assert!(constraints.realtime);
    }

    #[test]
    fn test_read_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "cat\ndog\n").unwrap();
        assert_eq!(read_labels(&path).unwrap(), vec!["cat", "dog"]);

        std::fs::write(&path, "\n").unwrap();
        assert!(read_labels(&path).is_err());
    }
}
