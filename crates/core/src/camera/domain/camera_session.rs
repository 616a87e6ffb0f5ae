use super::camera_source::CameraStream;

/// Scoped ownership of an acquired camera stream.
///
/// The device is released when the session is dropped or explicitly
/// released, so camera access never outlives the component using it.
pub struct CameraSession {
    stream: Box<dyn CameraStream>,
}

impl CameraSession {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &dyn CameraStream {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> &mut dyn CameraStream {
        self.stream.as_mut()
    }

    pub fn release(self) {
        // Drop does the work
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        log::debug!("Releasing camera stream");
        self.stream.stop();
    }
}
