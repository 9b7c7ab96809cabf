use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::CameraManager;
use crate::capability::Detector;
use crate::config::CaptureConfig;
use crate::session::SessionEvent;

use super::{subject_present, PresenceSignal};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub async fn detection_loop(
    generation: u64,
    camera: Arc<Mutex<CameraManager>>,
    detector: Option<Arc<dyn Detector>>,
    config: CaptureConfig,
    presence_tx: watch::Sender<PresenceSignal>,
    events: broadcast::Sender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    let mut ticker =
        tokio::time::interval(Duration::from_millis(config.detection_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if detector.is_none() {
        log_warn!(
            "detection capability unavailable; running degraded (frame availability as presence)"
        );
    }

    let mut last_present = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match perform_tick(&camera, detector.as_ref(), &config, last_present).await {
                    Some((present, detections)) => {
                        last_present = present;
                        let signal = PresenceSignal {
                            subject_present: present,
                            detector_backed: detector.is_some(),
                        };
                        presence_tx.send_replace(signal);
                        let _ = events.send(SessionEvent::Detections {
                            generation,
                            signal,
                            detections,
                        });
                    }
                    // Skipped tick: no frame buffered, or a swallowed
                    // inference error. Last known presence stands.
                    None => {}
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("detection loop shutting down (generation {generation})");
                break;
            }
        }
    }
}

/// One poll tick. Returns `None` when the tick produced nothing to
/// publish; `Some((present, detections))` otherwise.
async fn perform_tick(
    camera: &Arc<Mutex<CameraManager>>,
    detector: Option<&Arc<dyn Detector>>,
    config: &CaptureConfig,
    last_present: bool,
) -> Option<(bool, Vec<super::Detection>)> {
    let frame = {
        let mut guard = camera.lock().await;
        match guard.grab_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!("frame grab failed on detection tick: {err}");
                return None;
            }
        }
    };

    let Some(frame) = frame else {
        // Source has insufficient data; skip the tick entirely.
        return None;
    };

    let Some(detector) = detector else {
        // Degraded mode: a buffered frame is the presence signal.
        return Some((true, Vec::new()));
    };

    let detector = Arc::clone(detector);
    let inference = tokio::task::spawn_blocking(move || detector.detect(&frame)).await;

    match inference {
        Ok(Ok(detections)) => {
            let present =
                subject_present(&detections, &config.subject_label, config.min_confidence);
            Some((present, detections))
        }
        Ok(Err(err)) => {
            // A single failed tick never stops the loop or flips the
            // presence signal.
            log_warn!("detection tick failed: {err}; keeping subject_present={last_present}");
            None
        }
        Err(err) => {
            log_warn!("detection worker join failed: {err}");
            None
        }
    }
}
