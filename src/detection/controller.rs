use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::camera::CameraManager;
use crate::capability::Detector;
use crate::config::CaptureConfig;
use crate::session::SessionEvent;

use super::loop_worker::detection_loop;
use super::PresenceSignal;

/// Owns the lifecycle of the detection loop task: a cancellation token
/// plus the join handle. Start/stop are idempotent-friendly; stop on an
/// idle controller is a no-op.
pub struct DetectionController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    presence_tx: watch::Sender<PresenceSignal>,
}

impl DetectionController {
    pub fn new() -> Self {
        let (presence_tx, _) = watch::channel(PresenceSignal::default());
        Self {
            handle: None,
            cancel_token: None,
            presence_tx,
        }
    }

    /// Latest presence reading; resets to absent whenever a loop starts.
    pub fn presence(&self) -> PresenceSignal {
        *self.presence_tx.subscribe().borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceSignal> {
        self.presence_tx.subscribe()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        generation: u64,
        camera: Arc<Mutex<CameraManager>>,
        detector: Option<Arc<dyn Detector>>,
        config: &CaptureConfig,
        events: broadcast::Sender<SessionEvent>,
    ) {
        // A stale loop from a prior session must never outlive its
        // replacement.
        self.stop_and_detach();

        // send_replace stores the value even with no receiver subscribed;
        // `presence()` must observe the reset regardless of listeners.
        self.presence_tx.send_replace(PresenceSignal::default());

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(detection_loop(
            generation,
            camera,
            detector,
            config.clone(),
            self.presence_tx.clone(),
            events,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Cancel the loop and wait for the task to wind down. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Synchronous variant used on restart paths: cancels and drops the
    /// handle without awaiting the join.
    fn stop_and_detach(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Default for DetectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DetectionController {
    fn drop(&mut self) {
        self.stop_and_detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Frame, StreamConstraints};
    use crate::capability::{CameraDevice, CameraStream};
    use crate::detection::{BoundingBox, Detection};
    use crate::error::{CameraError, DetectionError};
    use tokio::time::Duration;

    struct StaticDevice;
    struct StaticStream;

    impl CameraStream for StaticStream {
        fn grab_frame(&mut self) -> Result<Option<Frame>, CameraError> {
            Ok(Some(Frame {
                bytes: vec![0; 16],
                width: 4,
                height: 4,
            }))
        }

        fn stop(&mut self) {}
    }

    impl CameraDevice for StaticDevice {
        fn open(&self, _: &StreamConstraints) -> Result<Box<dyn CameraStream>, CameraError> {
            Ok(Box::new(StaticStream))
        }
    }

    struct AlwaysPerson;

    impl crate::capability::Detector for AlwaysPerson {
        fn detect(&self, _: &Frame) -> Result<Vec<Detection>, DetectionError> {
            Ok(vec![Detection {
                label: "person".into(),
                confidence: 0.9,
                bounding_box: BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 2.0,
                    height: 2.0,
                },
            }])
        }
    }

    // The loop's presence reading must land even when nobody holds a
    // watch subscription; `presence()` is the only consumer the workflow
    // relies on.
    #[tokio::test(start_paused = true)]
    async fn presence_updates_without_external_subscriber() {
        let camera = Arc::new(Mutex::new(CameraManager::new(
            Arc::new(StaticDevice),
            StreamConstraints::default(),
        )));
        camera.lock().await.open().await.unwrap();

        let (events, _keepalive) = broadcast::channel(8);
        let mut controller = DetectionController::new();
        controller.start(
            1,
            Arc::clone(&camera),
            Some(Arc::new(AlwaysPerson)),
            &CaptureConfig::default(),
            events,
        );

        for _ in 0..100 {
            if controller.presence().subject_present {
                break;
            }
            tokio::time::advance(Duration::from_millis(50)).await;
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        let signal = controller.presence();
        assert!(signal.subject_present);
        assert!(signal.detector_backed);
        controller.stop().await;
    }
}
