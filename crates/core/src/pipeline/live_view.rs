use std::time::Instant;

use crate::camera::domain::camera_session::CameraSession;
use crate::camera::domain::camera_source::{CameraConstraints, CameraSource, CameraStream};
use crate::overlay::domain::overlay_mapper::{map_detections_to_screen, remap_on_resize};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::domain::overlay_set::OverlaySet;
use crate::pipeline::frame_loop_driver::{FrameLoopDriver, FrameOutcome};
use crate::pipeline::frame_loop_logger::{FrameLoopLogger, TickKind};
use crate::shared::constants::{MUTE_CAPTION, UNMUTE_CAPTION};
use crate::shared::detection::Detection;
use crate::shared::error::LiveViewError;
use crate::shared::viewport::{ViewportGeometry, ViewportLayout};

/// Owns all mutable state of the live camera view: the frame loop, the
/// attached overlays, the camera session and the UI flags.
pub struct LiveView {
    driver: FrameLoopDriver,
    overlays: OverlaySet,
    renderer: Box<dyn OverlayRenderer>,
    camera: Option<CameraSession>,
    full_window: bool,
    logger: Box<dyn FrameLoopLogger>,
}

impl LiveView {
    pub fn new(
        driver: FrameLoopDriver,
        renderer: Box<dyn OverlayRenderer>,
        logger: Box<dyn FrameLoopLogger>,
    ) -> Self {
        Self {
            driver,
            overlays: OverlaySet::new(),
            renderer,
            camera: None,
            full_window: false,
            logger,
        }
    }

    pub fn is_camera_enabled(&self) -> bool {
        self.camera.is_some()
    }

    pub fn is_full_window(&self) -> bool {
        self.full_window
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    /// Polls the detector loader. `Ok` once detection can run.
    pub fn detector_status(&mut self) -> Result<(), LiveViewError> {
        self.driver.detector_status()
    }

    /// True once the camera source has delivered its last frame.
    pub fn is_stream_ended(&self) -> bool {
        self.camera
            .as_ref()
            .is_some_and(|session| session.stream().is_ended())
    }

    /// Starts the webcam. Refused until the detector has loaded.
    pub fn enable_camera(
        &mut self,
        source: &mut dyn CameraSource,
        constraints: &CameraConstraints,
    ) -> Result<(), LiveViewError> {
        match self.driver.detector_status() {
            Ok(()) => {}
            Err(LiveViewError::DetectorNotReady) => {
                log::warn!("Wait! Object detector is not loaded yet.");
                return Err(LiveViewError::DetectorNotReady);
            }
            Err(e) => {
                log::error!("Cannot enable camera: {e}");
                return Err(e);
            }
        }
        if !source.is_supported() {
            log::error!("Camera capture is not supported on this system");
            return Err(LiveViewError::CameraAccessDenied(
                "camera capture is not supported".to_string(),
            ));
        }

        let stream = source.request_stream(constraints).map_err(|e| {
            log::error!("Camera access failed: {e}");
            LiveViewError::from(e)
        })?;

        if let Some(previous) = self.camera.replace(CameraSession::new(stream)) {
            previous.release();
        }
        self.driver.reset_stream();
        self.logger.info(&format!("Camera enabled: {}", constraints.device));
        Ok(())
    }

    /// Stops the webcam and detaches every overlay.
    pub fn disable_camera(&mut self) -> Result<(), LiveViewError> {
        let Some(session) = self.camera.take() else {
            return Ok(());
        };
        session.release();
        self.logger.info("Camera disabled");
        self.overlays
            .clear(self.renderer.as_mut())
            .map_err(|e| LiveViewError::Render(e.to_string()))
    }

    /// One refresh tick: detect on a new frame, re-place overlays, present.
    ///
    /// Any failure after detection leaves no overlays attached.
    pub fn on_frame_ready(&mut self) -> Result<FrameOutcome, LiveViewError> {
        let Some(session) = self.camera.as_mut() else {
            return Err(LiveViewError::CameraNotEnabled);
        };

        let detect_start = Instant::now();
        let outcome = match self.driver.on_frame_ready(session.stream_mut()) {
            Ok(outcome) => outcome,
            Err(e) => {
                let kind = match e {
                    LiveViewError::DetectorNotReady => TickKind::NotReady,
                    _ => TickKind::Failed,
                };
                self.logger.tick(kind);
                return Err(e);
            }
        };

        let (detections, timestamp_ms) = match outcome {
            FrameOutcome::Detected {
                detections,
                timestamp_ms,
            } => (detections, timestamp_ms),
            FrameOutcome::NoFrame => {
                self.logger.tick(TickKind::NoFrame);
                return Ok(FrameOutcome::NoFrame);
            }
            FrameOutcome::Duplicate => {
                self.logger.tick(TickKind::Duplicate);
                return Ok(FrameOutcome::Duplicate);
            }
        };
        self.logger
            .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);

        let render_start = Instant::now();
        let result = render_detections(
            &detections,
            session.stream(),
            self.full_window,
            &mut self.overlays,
            self.renderer.as_mut(),
        );
        if let Err(e) = result {
            if let Err(clear_err) = self.overlays.clear(self.renderer.as_mut()) {
                log::warn!("Failed to detach overlays: {clear_err}");
            }
            self.logger.tick(TickKind::Failed);
            return Err(e);
        }

        self.logger
            .timing("render", render_start.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("overlays", self.overlays.len() as f64);
        self.logger.tick(TickKind::Processed);
        Ok(FrameOutcome::Detected {
            detections,
            timestamp_ms,
        })
    }

    /// Flips between windowed and full-window layout and re-places the
    /// current overlays. Returns the new state.
    pub fn toggle_full_window(&mut self) -> Result<bool, LiveViewError> {
        self.full_window = !self.full_window;
        self.renderer
            .apply_full_window(self.full_window)
            .map_err(|e| LiveViewError::Render(e.to_string()))?;
        self.remap_overlays()?;
        Ok(self.full_window)
    }

    /// Reports a window resize. Overlays only move while in full window.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<(), LiveViewError> {
        self.renderer
            .set_window_size(width, height)
            .map_err(|e| LiveViewError::Render(e.to_string()))?;
        if self.full_window {
            self.remap_overlays()?;
        }
        Ok(())
    }

    /// Flips the stream's mute flag and returns the caption for the mute
    /// control.
    pub fn toggle_mute(&mut self) -> Result<&'static str, LiveViewError> {
        let session = self.camera.as_mut().ok_or(LiveViewError::CameraNotEnabled)?;
        let stream = session.stream_mut();
        let muted = !stream.is_muted();
        stream.set_muted(muted);
        Ok(if muted { UNMUTE_CAPTION } else { MUTE_CAPTION })
    }

    /// Releases the camera and emits the logger summary.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.disable_camera() {
            log::warn!("Failed to detach overlays: {e}");
        }
        self.logger.summary();
    }

    fn remap_overlays(&mut self) -> Result<(), LiveViewError> {
        if self.overlays.is_empty() {
            return Ok(());
        }
        let session = self.camera.as_ref().ok_or(LiveViewError::CameraNotEnabled)?;
        let geometry = geometry_for(
            session.stream(),
            self.renderer.viewport_layout(),
            self.full_window,
        )?;
        let placements = remap_on_resize(self.overlays.elements(), &geometry)?;
        self.overlays
            .remap(&placements, self.renderer.as_mut())
            .map_err(|e| LiveViewError::Render(e.to_string()))
    }
}

fn geometry_for(
    stream: &dyn CameraStream,
    layout: ViewportLayout,
    full_window: bool,
) -> Result<ViewportGeometry, LiveViewError> {
    let (width, height) = stream.video_size().unwrap_or((0, 0));
    let geometry = ViewportGeometry::new(layout, width, height, full_window);
    geometry.ensure_video_loaded()?;
    Ok(geometry)
}

fn render_detections(
    detections: &[Detection],
    stream: &dyn CameraStream,
    full_window: bool,
    overlays: &mut OverlaySet,
    renderer: &mut dyn OverlayRenderer,
) -> Result<(), LiveViewError> {
    let geometry = geometry_for(stream, renderer.viewport_layout(), full_window)?;
    let placements = map_detections_to_screen(detections, &geometry)?;
    overlays
        .replace(detections, &placements, renderer)
        .map_err(|e| LiveViewError::Render(e.to_string()))?;

    if let Some(frame) = stream.current_frame() {
        renderer
            .present(frame)
            .map_err(|e| LiveViewError::Render(e.to_string()))?;
    }
    Ok(())
}
