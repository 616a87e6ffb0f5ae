use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::camera::domain::camera_source::{
    CameraConstraints, CameraError, CameraSource, CameraStream,
};
use crate::shared::frame::Frame;

/// How long to wait for the device to deliver its stream parameters.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Decoded frames buffered between the capture thread and the consumer.
const FRAME_QUEUE_CAPACITY: usize = 2;

type OpenResult = Result<(u32, u32), String>;

/// Captures from any source libavformat/libavdevice can open: V4L2 and
/// AVFoundation cameras, network streams, or recorded files.
pub struct FfmpegCameraSource;

impl FfmpegCameraSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegCameraSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSource for FfmpegCameraSource {
    fn is_supported(&self) -> bool {
        ffmpeg_next::init().is_ok()
    }

    fn request_stream(
        &mut self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if !self.is_supported() {
            return Err(CameraError::NotSupported(
                "ffmpeg failed to initialise".to_string(),
            ));
        }
        check_device_access(&constraints.device)?;
        let stream = FfmpegCameraStream::open(constraints.clone())?;
        Ok(Box::new(stream))
    }
}

/// Fails early with `PermissionDenied` for local device nodes the process
/// cannot read. Anything that isn't a local path is left to ffmpeg.
fn check_device_access(device: &str) -> Result<(), CameraError> {
    let path = Path::new(device);
    if !path.exists() {
        return Ok(());
    }
    match fs::File::open(path) {
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(CameraError::PermissionDenied {
            device: device.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Stream backed by a capture thread that decodes to RGB24.
///
/// The consumer keeps only the newest frame; older frames are dropped so
/// detection always runs on what is currently in front of the camera.
pub struct FfmpegCameraStream {
    frames: Receiver<Frame>,
    latest: Option<Frame>,
    video_size: (u32, u32),
    muted: bool,
    ended: bool,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FfmpegCameraStream {
    fn open(constraints: CameraConstraints) -> Result<Self, CameraError> {
        let device = constraints.device.clone();
        let (setup_tx, setup_rx) = crossbeam_channel::bounded::<OpenResult>(1);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(FRAME_QUEUE_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let stop_clone = stop.clone();
        let handle = thread::spawn(move || {
            run_capture(&constraints, &setup_tx, &frame_tx, &stop_clone);
        });

        let video_size = match setup_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(size)) => size,
            Ok(Err(reason)) => {
                let _ = handle.join();
                return Err(CameraError::Open { device, reason });
            }
            Err(_) => {
                stop.store(true, Ordering::Relaxed);
                return Err(CameraError::Open {
                    device,
                    reason: "timed out waiting for the device".to_string(),
                });
            }
        };

        log::info!(
            "Camera {device} opened at {}x{}",
            video_size.0,
            video_size.1
        );

        Ok(Self {
            frames: frame_rx,
            latest: None,
            video_size,
            muted: false,
            ended: false,
            stop,
            handle: Some(handle),
        })
    }

    /// Moves everything queued by the capture thread into `latest`.
    fn drain(&mut self) {
        loop {
            match self.frames.try_recv() {
                Ok(frame) => self.latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.ended = true;
                    break;
                }
            }
        }
    }
}

impl CameraStream for FfmpegCameraStream {
    fn video_size(&self) -> Option<(u32, u32)> {
        self.latest.as_ref().map(|_| self.video_size)
    }

    fn current_time(&mut self) -> Option<f64> {
        self.drain();
        self.latest.as_ref().map(Frame::timestamp)
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.ended = true;
    }
}

impl Drop for FfmpegCameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

fn run_capture(
    constraints: &CameraConstraints,
    setup_tx: &Sender<OpenResult>,
    frame_tx: &Sender<Frame>,
    stop: &AtomicBool,
) {
    let mut ictx = match open_input(constraints) {
        Ok(ictx) => ictx,
        Err(e) => {
            let _ = setup_tx.send(Err(e.to_string()));
            return;
        }
    };

    let Some(stream) = ictx.streams().best(ffmpeg_next::media::Type::Video) else {
        let _ = setup_tx.send(Err("No video stream found".to_string()));
        return;
    };
    let stream_index = stream.index();
    let time_base = f64::from(stream.time_base());
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|ctx| ctx.decoder().video());
    let mut decoder = match decoder {
        Ok(d) => d,
        Err(e) => {
            let _ = setup_tx.send(Err(e.to_string()));
            return;
        }
    };

    let width = decoder.width();
    let height = decoder.height();
    let scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    );
    let mut scaler = match scaler {
        Ok(s) => s,
        Err(e) => {
            let _ = setup_tx.send(Err(e.to_string()));
            return;
        }
    };

    if setup_tx.send(Ok((width, height))).is_err() {
        return;
    }

    let mut output = FrameOutput {
        width,
        height,
        time_base,
        realtime: constraints.realtime,
        started: Instant::now(),
        frame_index: 0,
    };

    for (packet_stream, packet) in ictx.packets() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if packet_stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        if !output.drain_decoder(&mut decoder, &mut scaler, frame_tx, stop) {
            return;
        }
    }

    if !stop.load(Ordering::Relaxed) && decoder.send_eof().is_ok() {
        output.drain_decoder(&mut decoder, &mut scaler, frame_tx, stop);
    }
    log::debug!("Capture thread finished after {} frames", output.frame_index);
}

/// Converts decoded frames to RGB and hands them to the consumer.
struct FrameOutput {
    width: u32,
    height: u32,
    time_base: f64,
    realtime: bool,
    started: Instant,
    frame_index: usize,
}

impl FrameOutput {
    /// Sends every frame the decoder has ready. Returns `false` once the
    /// consumer is gone.
    fn drain_decoder(
        &mut self,
        decoder: &mut ffmpeg_next::decoder::Video,
        scaler: &mut ffmpeg_next::software::scaling::Context,
        frame_tx: &Sender<Frame>,
        stop: &AtomicBool,
    ) -> bool {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = scaler.run(&decoded, &mut rgb_frame) {
                log::warn!("Dropping frame {}: {e}", self.frame_index);
                continue;
            }

            let timestamp = decoded
                .timestamp()
                .map(|pts| pts as f64 * self.time_base)
                .unwrap_or_else(|| self.started.elapsed().as_secs_f64());

            if self.realtime {
                pace(self.started, timestamp, stop);
            }

            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            let frame = Frame::new(
                pixels,
                self.width,
                self.height,
                3,
                self.frame_index,
                timestamp,
            );
            self.frame_index += 1;

            match frame_tx.try_send(frame) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
        true
    }
}

fn open_input(
    constraints: &CameraConstraints,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    ffmpeg_next::init()?;

    let mut options = ffmpeg_next::Dictionary::new();
    if let (Some(w), Some(h)) = (constraints.width, constraints.height) {
        options.set("video_size", &format!("{w}x{h}"));
    }
    if let Some(fps) = constraints.frame_rate {
        options.set("framerate", &fps.to_string());
    }

    match constraints.input_format.as_deref() {
        Some(name) => {
            ffmpeg_next::device::register_all();
            let format = ffmpeg_next::device::input::video()
                .find(|f| f.name() == name)
                .ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
            let ctx = ffmpeg_next::format::open_with(&constraints.device, &format, options)?;
            Ok(ctx.input())
        }
        None => ffmpeg_next::format::input_with_dictionary(&constraints.device, options),
    }
}

/// Sleeps until wall-clock time catches up with `timestamp`.
fn pace(started: Instant, timestamp: f64, stop: &AtomicBool) {
    if !timestamp.is_finite() || timestamp <= 0.0 {
        return;
    }
    let due = Duration::from_secs_f64(timestamp);
    let elapsed = started.elapsed();
    if due > elapsed && !stop.load(Ordering::Relaxed) {
        thread::sleep(due - elapsed);
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
