use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::error::LiveViewError;

type LoadResult = Result<Box<dyn ObjectDetector>, String>;

/// Holds a detector that is loaded on a background thread.
///
/// Callers poll the slot once per tick; it never blocks unless asked to
/// via [`DetectorSlot::wait_ready`].
pub enum DetectorSlot {
    Loading(Receiver<LoadResult>),
    Ready(Box<dyn ObjectDetector>),
    Failed(String),
}

impl DetectorSlot {
    /// Runs `build` on a new thread and returns a slot in `Loading` state.
    pub fn spawn_loader<F>(build: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let result = build().map_err(|e| e.to_string());
            let _ = tx.send(result);
        });
        DetectorSlot::Loading(rx)
    }

    pub fn ready(detector: Box<dyn ObjectDetector>) -> Self {
        DetectorSlot::Ready(detector)
    }

    /// Picks up a finished load without blocking.
    pub fn poll(&mut self) {
        if let DetectorSlot::Loading(rx) = self {
            match rx.try_recv() {
                Ok(result) => self.settle(result),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    *self = DetectorSlot::Failed("detector loader exited".to_string());
                }
            }
        }
    }

    /// Blocks until the load finishes or `timeout` elapses.
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<(), LiveViewError> {
        if let DetectorSlot::Loading(rx) = self {
            match rx.recv_timeout(timeout) {
                Ok(result) => self.settle(result),
                Err(RecvTimeoutError::Timeout) => return Err(LiveViewError::DetectorNotReady),
                Err(RecvTimeoutError::Disconnected) => {
                    *self = DetectorSlot::Failed("detector loader exited".to_string());
                }
            }
        }
        self.status()
    }

    /// `Ok` when ready, otherwise the reason it isn't.
    pub fn status(&self) -> Result<(), LiveViewError> {
        match self {
            DetectorSlot::Ready(_) => Ok(()),
            DetectorSlot::Loading(_) => Err(LiveViewError::DetectorNotReady),
            DetectorSlot::Failed(reason) => Err(LiveViewError::DetectorLoadFailed(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DetectorSlot::Ready(_))
    }

    pub fn detector_mut(&mut self) -> Option<&mut (dyn ObjectDetector + 'static)> {
        match self {
            DetectorSlot::Ready(detector) => Some(detector.as_mut()),
            _ => None,
        }
    }

    fn settle(&mut self, result: LoadResult) {
        *self = match result {
            Ok(detector) => {
                log::info!("Object detector ready ({} mode)", detector.running_mode());
                DetectorSlot::Ready(detector)
            }
            Err(reason) => {
                log::error!("Failed to load object detector: {reason}");
                DetectorSlot::Failed(reason)
            }
        };
    }
}
