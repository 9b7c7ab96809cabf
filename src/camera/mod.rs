//! Camera session manager.
//!
//! Owns the capture stream for the lifetime of a live session. `close` is
//! idempotent and is called on every exit path: cancel, retake, capture
//! completion, submission success, and engine teardown.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::capability::{CameraDevice, CameraStream};
use crate::error::CameraError;

/// An encoded still frame (JPEG) plus its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Constraints passed to [`CameraDevice::open`]. Video only — there is no
/// audio field on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub front_facing: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            front_facing: true,
        }
    }
}

pub struct CameraManager {
    device: Arc<dyn CameraDevice>,
    constraints: StreamConstraints,
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraManager {
    pub fn new(device: Arc<dyn CameraDevice>, constraints: StreamConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
        }
    }

    /// Acquire the capture stream. Fails if one is already held; the
    /// workflow always closes before reopening (retake restarts the
    /// session rather than resuming a stale stream). The device call may
    /// block, so it runs on the blocking pool.
    pub async fn open(&mut self) -> Result<(), CameraError> {
        if self.stream.is_some() {
            return Err(CameraError::Device("stream already open".into()));
        }
        let device = Arc::clone(&self.device);
        let constraints = self.constraints.clone();
        let stream = tokio::task::spawn_blocking(move || device.open(&constraints))
            .await
            .map_err(|_| CameraError::Device("camera open worker failed".into()))??;
        self.stream = Some(stream);
        info!(
            "camera stream opened ({}x{})",
            self.constraints.width, self.constraints.height
        );
        Ok(())
    }

    /// Stop every track and release the handle. Safe to call when no
    /// stream is held.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("camera stream closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Grab the most recent frame from the live stream. `Ok(None)` when
    /// the source has nothing buffered yet. The stream is moved onto the
    /// blocking pool for the read and reinstalled afterwards.
    pub async fn grab_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(None);
        };
        let joined = tokio::task::spawn_blocking(move || {
            let frame = stream.grab_frame();
            (stream, frame)
        })
        .await;
        match joined {
            Ok((stream, frame)) => {
                self.stream = Some(stream);
                frame
            }
            // The worker panicked; the stream is gone with it.
            Err(_) => Err(CameraError::Device("frame grab worker failed".into())),
        }
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDevice {
        opens: AtomicUsize,
        stops: Arc<AtomicUsize>,
    }

    struct CountingStream {
        stops: Arc<AtomicUsize>,
    }

    impl CameraStream for CountingStream {
        fn grab_frame(&mut self) -> Result<Option<Frame>, CameraError> {
            Ok(Some(Frame {
                bytes: vec![1, 2, 3],
                width: 2,
                height: 2,
            }))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CameraDevice for CountingDevice {
        fn open(&self, _: &StreamConstraints) -> Result<Box<dyn CameraStream>, CameraError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingStream {
                stops: self.stops.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let stops = Arc::new(AtomicUsize::new(0));
        let device = Arc::new(CountingDevice {
            opens: AtomicUsize::new(0),
            stops: stops.clone(),
        });
        let mut manager = CameraManager::new(device, StreamConstraints::default());

        manager.open().await.unwrap();
        assert!(manager.is_open());

        manager.close();
        manager.close();
        assert!(!manager.is_open());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn grab_without_stream_yields_none() {
        let device = Arc::new(CountingDevice {
            opens: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
        });
        let mut manager = CameraManager::new(device, StreamConstraints::default());
        assert_eq!(manager.grab_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn double_open_is_rejected() {
        let device = Arc::new(CountingDevice {
            opens: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
        });
        let mut manager = CameraManager::new(device, StreamConstraints::default());
        manager.open().await.unwrap();
        assert!(manager.open().await.is_err());
    }

    struct PanickingDevice;

    impl CameraDevice for PanickingDevice {
        fn open(&self, _: &StreamConstraints) -> Result<Box<dyn CameraStream>, CameraError> {
            panic!("driver crash");
        }
    }

    #[tokio::test]
    async fn device_panic_surfaces_as_device_error() {
        let mut manager =
            CameraManager::new(Arc::new(PanickingDevice), StreamConstraints::default());
        let err = manager.open().await.unwrap_err();
        assert!(matches!(err, CameraError::Device(_)));
        assert!(!manager.is_open());
    }
}
