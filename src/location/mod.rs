//! One-shot geolocation acquisition.
//!
//! Runs concurrently with and independently of the detection loop and
//! the workflow's transitions. Failure is never fatal to a session; the
//! sentinel location is substituted at submission time.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::capability::LocationProvider;
use crate::error::{ErrorInfo, LocationError};
use crate::session::{CaptureState, SessionEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns the in-flight acquisition task, if any. One fix is recorded at
/// most once per session; a retake does not re-request.
pub struct LocationAcquirer {
    handle: Option<JoinHandle<()>>,
}

impl LocationAcquirer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Kick off the one-shot fix. The provider call runs on the blocking
    /// pool, bounded by `timeout_ms`; the result is applied to session
    /// state only if the session generation still matches.
    pub fn start(
        &mut self,
        generation: u64,
        provider: Arc<dyn LocationProvider>,
        timeout_ms: u64,
        state: Arc<Mutex<CaptureState>>,
        events: broadcast::Sender<SessionEvent>,
    ) {
        if self.is_running() {
            return;
        }

        let handle = tokio::spawn(async move {
            let fix = acquire(provider, timeout_ms).await;

            let mut guard = state.lock().await;
            if guard.generation != generation {
                // Stale callback: the session was reset while the fix
                // was in flight.
                log_info!("discarding location result for stale generation {generation}");
                return;
            }

            match fix {
                Ok(fix) => {
                    if guard.location.is_none() {
                        guard.location = Some(fix);
                    }
                    let _ = events.send(SessionEvent::LocationUpdate {
                        generation,
                        fix: guard.location,
                        error: None,
                    });
                }
                Err(err) => {
                    log_warn!("location fix unavailable: {err}");
                    let _ = events.send(SessionEvent::LocationUpdate {
                        generation,
                        fix: None,
                        error: Some(ErrorInfo::from(&err)),
                    });
                }
            }
        });

        self.handle = Some(handle);
    }

    /// Abort the in-flight task, if any. Idempotent. The provider call
    /// itself is not interruptible; its eventual result is discarded by
    /// the generation guard.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Default for LocationAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocationAcquirer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn acquire(
    provider: Arc<dyn LocationProvider>,
    timeout_ms: u64,
) -> Result<crate::models::GeoFix, LocationError> {
    let fetch = tokio::task::spawn_blocking(move || provider.current_position(true));

    match tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await {
        Ok(Ok(result)) => result,
        Ok(Err(_join_err)) => Err(LocationError::Unsupported),
        Err(_elapsed) => Err(LocationError::Timeout),
    }
}
