//! Capture/review/confirm workflow.
//!
//! The controller is the single mutator of [`CaptureState`]; the camera
//! manager, detection loop, and location acquirer report upward and the
//! transitions here interpret them. Every async continuation carries the
//! generation it was issued under and no-ops if the session has since
//! been reset.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use uuid::Uuid;

use crate::camera::CameraManager;
use crate::capability::{CameraDevice, Detector, LocationProvider};
use crate::config::CaptureConfig;
use crate::detection::{DetectionController, PresenceSignal};
use crate::error::{DetectionError, ErrorInfo, ErrorKind, SessionError, StoreError};
use crate::location::LocationAcquirer;
use crate::models::{AttendanceRecord, AttendanceStats, DeviceInfo, GeoFix, SubjectIdentity};
use crate::store::RecordStore;

use super::{CaptureState, SessionEvent, SessionPhase};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct SessionController<S: RecordStore> {
    subject: SubjectIdentity,
    config: CaptureConfig,
    state: Arc<Mutex<CaptureState>>,
    camera: Arc<Mutex<CameraManager>>,
    detection: Arc<Mutex<DetectionController>>,
    location: Arc<Mutex<LocationAcquirer>>,
    location_provider: Arc<dyn LocationProvider>,
    detector: Option<Arc<dyn Detector>>,
    store: S,
    events: broadcast::Sender<SessionEvent>,
    countdown: Arc<Mutex<Option<JoinHandle<()>>>>,
    reset_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<S: RecordStore> SessionController<S> {
    pub fn new(
        subject: SubjectIdentity,
        config: CaptureConfig,
        device: Arc<dyn CameraDevice>,
        detector: Option<Arc<dyn Detector>>,
        location_provider: Arc<dyn LocationProvider>,
        store: S,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let camera = CameraManager::new(device, config.camera.clone());

        if detector.is_none() {
            warn!("no detector configured; sessions will run in degraded mode");
        }

        Self {
            subject,
            config,
            state: Arc::new(Mutex::new(CaptureState::new())),
            camera: Arc::new(Mutex::new(camera)),
            detection: Arc::new(Mutex::new(DetectionController::new())),
            location: Arc::new(Mutex::new(LocationAcquirer::new())),
            location_provider,
            detector,
            store,
            events,
            countdown: Arc::new(Mutex::new(None)),
            reset_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subject(&self) -> &SubjectIdentity {
        &self.subject
    }

    /// Current session state, with the live presence signal folded in
    /// while the detection loop is running.
    pub async fn snapshot(&self) -> CaptureState {
        let mut snapshot = { self.state.lock().await.clone() };
        if snapshot.phase.holds_camera() {
            snapshot.subject_present = self.presence().await.subject_present;
        }
        snapshot
    }

    pub async fn presence(&self) -> PresenceSignal {
        self.detection.lock().await.presence()
    }

    pub async fn presence_watch(&self) -> watch::Receiver<PresenceSignal> {
        self.detection.lock().await.subscribe()
    }

    /// Idle → Starting → Live. Opens the camera and, on success, starts
    /// the detection loop and the one-shot location fix.
    pub async fn start(&self) -> Result<(), SessionError> {
        let generation = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Idle {
                return Err(SessionError::InvalidState);
            }
            let session_id = Uuid::new_v4().to_string();
            info!("starting capture session {session_id}");
            state.begin_session(session_id, Utc::now());
            state.generation
        };
        self.emit_phase(SessionPhase::Starting, generation);

        let open_result = { self.camera.lock().await.open().await };
        if let Err(err) = open_result {
            warn!("camera open failed: {err}");
            let error = ErrorInfo::from(&err);
            let idle_generation = {
                let mut state = self.state.lock().await;
                state.reset();
                state.error = Some(error.clone());
                state.generation
            };
            let _ = self.events.send(SessionEvent::SessionFailed { error });
            self.emit_phase(SessionPhase::Idle, idle_generation);
            return Err(SessionError::Camera(err));
        }

        self.enter_live(generation).await
    }

    /// Live + subject present → CountingDown. Idempotent while the
    /// countdown is already running. Rejected (without a transition)
    /// while the presence signal is false: the gate is enforced here,
    /// not just at the disabled button.
    pub async fn request_capture(&self) -> Result<(), SessionError> {
        let presence = self.presence().await;

        let generation = {
            let mut state = self.state.lock().await;
            match state.phase {
                SessionPhase::CountingDown => return Ok(()),
                SessionPhase::Live => {}
                _ => return Err(SessionError::InvalidState),
            }
            if !presence.subject_present {
                return Err(SessionError::SubjectNotPresent);
            }
            state.phase = SessionPhase::CountingDown;
            state.subject_present = true;
            state.countdown_remaining = self.config.countdown_ticks;
            state.error = None;
            state.generation
        };

        self.emit_phase(SessionPhase::CountingDown, generation);
        self.spawn_countdown(generation).await;
        Ok(())
    }

    /// Reviewing → Starting → Live, discarding the captured frame. The
    /// camera session is fully restarted rather than resumed.
    pub async fn retake(&self) -> Result<(), SessionError> {
        let generation = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Reviewing {
                return Err(SessionError::InvalidState);
            }
            state.captured_frame = None;
            state.error = None;
            state.phase = SessionPhase::Starting;
            state.generation
        };
        self.emit_phase(SessionPhase::Starting, generation);

        let open_result = { self.camera.lock().await.open().await };
        if let Err(err) = open_result {
            warn!("camera reopen failed on retake: {err}");
            let error = ErrorInfo::from(&err);
            let idle_generation = {
                let mut state = self.state.lock().await;
                state.reset();
                state.error = Some(error.clone());
                state.generation
            };
            let _ = self.events.send(SessionEvent::SessionFailed { error });
            self.emit_phase(SessionPhase::Idle, idle_generation);
            return Err(SessionError::Camera(err));
        }

        self.enter_live(generation).await
    }

    /// Reviewing → Submitting → Succeeded | Reviewing. Assembles the
    /// record (timestamp at submission time, sentinel location when no
    /// fix arrived) and appends it to the store at most once; a second
    /// confirm while one is in flight is rejected by the phase check.
    pub async fn confirm(&self) -> Result<AttendanceRecord, SessionError> {
        let (generation, frame, location) = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Reviewing {
                return Err(SessionError::InvalidState);
            }
            let Some(frame) = state.captured_frame.clone() else {
                return Err(SessionError::InvalidState);
            };
            state.phase = SessionPhase::Submitting;
            state.error = None;
            (state.generation, frame, state.location)
        };
        self.emit_phase(SessionPhase::Submitting, generation);

        let mut record = AttendanceRecord {
            id: None,
            subject_id: self.subject.id.clone(),
            subject_name: self.subject.display_name.clone(),
            email: self.subject.email.clone(),
            captured_at: Utc::now(),
            location: location.unwrap_or(GeoFix::SENTINEL),
            verified: true,
            photo: Some(frame.bytes),
            device: DeviceInfo::collect(),
        };

        match self.store.append(&record).await {
            Ok(record_id) => {
                record.id = Some(record_id.clone());
                // The record is durable regardless; the history view can
                // refresh even if the session was torn down mid-flight.
                let _ = self.events.send(SessionEvent::HistoryInvalidated);

                {
                    let mut state = self.state.lock().await;
                    if state.generation != generation {
                        info!("session reset while submitting; dropping stale success");
                        return Err(SessionError::InvalidState);
                    }
                    state.phase = SessionPhase::Succeeded;
                }
                info!("attendance record {record_id} appended");
                let _ = self.events.send(SessionEvent::SessionSucceeded {
                    record_id,
                    record: record.clone(),
                });
                self.emit_phase(SessionPhase::Succeeded, generation);
                self.spawn_success_reset(generation).await;
                Ok(record)
            }
            Err(err) => {
                warn!("submission failed: {err}");
                let error = ErrorInfo::from(&err);
                let returned = {
                    let mut state = self.state.lock().await;
                    if state.generation == generation && state.phase == SessionPhase::Submitting {
                        // Frame stays in place so the user can retry the
                        // confirm without re-capturing.
                        state.phase = SessionPhase::Reviewing;
                        state.error = Some(error.clone());
                        true
                    } else {
                        false
                    }
                };
                let _ = self.events.send(SessionEvent::SessionFailed { error });
                if returned {
                    self.emit_phase(SessionPhase::Reviewing, generation);
                }
                Err(SessionError::Submission(err))
            }
        }
    }

    /// User cancel and host teardown both land here: stop every
    /// sub-process, release the camera, and reset to idle. Safe to call
    /// from any phase, any number of times.
    pub async fn cancel(&self) {
        if let Some(handle) = self.countdown.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.reset_task.lock().await.take() {
            handle.abort();
        }
        self.location.lock().await.stop();
        self.detection.lock().await.stop().await;
        {
            self.camera.lock().await.close();
        }

        let reset_to = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Idle {
                None
            } else {
                state.reset();
                Some(state.generation)
            }
        };
        if let Some(generation) = reset_to {
            info!("capture session cancelled");
            self.emit_phase(SessionPhase::Idle, generation);
        }
    }

    /// Resource-safety net for component teardown; identical effect to
    /// [`cancel`](Self::cancel).
    pub async fn shutdown(&self) {
        self.cancel().await;
    }

    /// Subject history, newest first. Used by the surrounding history
    /// view, not by the workflow itself.
    pub async fn history(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.store.records_for_subject(&self.subject.id).await
    }

    pub async fn stats(&self) -> Result<AttendanceStats, StoreError> {
        self.store.stats_for_subject(&self.subject.id).await
    }

    /// Shared tail of `start` and `retake`: the camera is open; bring up
    /// the detection loop and (at most one per session) the location fix.
    async fn enter_live(&self, generation: u64) -> Result<(), SessionError> {
        let still_current = {
            let mut state = self.state.lock().await;
            if state.generation == generation && state.phase == SessionPhase::Starting {
                state.phase = SessionPhase::Live;
                if self.detector.is_none() {
                    // Soft notice: the session proceeds, but the host can
                    // tell the user detection is not running.
                    state.error = Some(ErrorInfo::from(&DetectionError::Unavailable));
                }
                true
            } else {
                false
            }
        };
        if !still_current {
            // Cancelled while the device was opening.
            self.camera.lock().await.close();
            return Err(SessionError::InvalidState);
        }

        self.detection.lock().await.start(
            generation,
            Arc::clone(&self.camera),
            self.detector.clone(),
            &self.config,
            self.events.clone(),
        );

        let needs_fix = { self.state.lock().await.location.is_none() };
        if needs_fix {
            self.location.lock().await.start(
                generation,
                Arc::clone(&self.location_provider),
                self.config.location_timeout_ms,
                Arc::clone(&self.state),
                self.events.clone(),
            );
        }

        self.emit_phase(SessionPhase::Live, generation);
        Ok(())
    }

    /// Three strictly ordered real-time ticks, then: grab the still
    /// frame, stop detection, close the camera, enter Reviewing. Each
    /// step re-checks the generation so a cancel mid-countdown wins.
    async fn spawn_countdown(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let camera = Arc::clone(&self.camera);
        let detection = Arc::clone(&self.detection);
        let events = self.events.clone();
        let ticks = self.config.countdown_ticks;
        let tick = Duration::from_millis(self.config.countdown_tick_ms);

        let handle = tokio::spawn(async move {
            for remaining in (1..=ticks).rev() {
                time::sleep(tick).await;
                {
                    let mut guard = state.lock().await;
                    if guard.generation != generation
                        || guard.phase != SessionPhase::CountingDown
                    {
                        return;
                    }
                    guard.countdown_remaining = remaining - 1;
                }
                let _ = events.send(SessionEvent::CountdownTick {
                    generation,
                    remaining: remaining - 1,
                });
            }

            let frame = { camera.lock().await.grab_frame().await };

            // The camera is released on this path no matter how the grab
            // went; Reviewing never holds the handle.
            detection.lock().await.stop().await;
            {
                camera.lock().await.close();
            }

            let mut guard = state.lock().await;
            if guard.generation != generation || guard.phase != SessionPhase::CountingDown {
                return;
            }

            match frame {
                Ok(Some(frame)) => {
                    guard.phase = SessionPhase::Reviewing;
                    guard.captured_frame = Some(frame);
                    guard.subject_present = false;
                    drop(guard);
                    let _ = events.send(SessionEvent::StateChanged {
                        phase: SessionPhase::Reviewing,
                        generation,
                    });
                }
                Ok(None) | Err(_) => {
                    let error = ErrorInfo::new(
                        ErrorKind::DeviceError,
                        "camera produced no frame at countdown end",
                    );
                    guard.phase = SessionPhase::Failed;
                    guard.error = Some(error.clone());
                    drop(guard);
                    warn!("still-frame grab failed at countdown end");
                    let _ = events.send(SessionEvent::SessionFailed { error });
                    let _ = events.send(SessionEvent::StateChanged {
                        phase: SessionPhase::Failed,
                        generation,
                    });
                }
            }
        });

        let mut guard = self.countdown.lock().await;
        if let Some(stale) = guard.replace(handle) {
            stale.abort();
        }
    }

    /// After the fixed success display delay, return to idle and let the
    /// caller's history view take over.
    async fn spawn_success_reset(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let delay = Duration::from_millis(self.config.success_display_ms);

        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let idle_generation = {
                let mut guard = state.lock().await;
                if guard.generation != generation || guard.phase != SessionPhase::Succeeded {
                    return;
                }
                guard.reset();
                guard.generation
            };
            let _ = events.send(SessionEvent::StateChanged {
                phase: SessionPhase::Idle,
                generation: idle_generation,
            });
        });

        let mut guard = self.reset_task.lock().await;
        if let Some(stale) = guard.replace(handle) {
            stale.abort();
        }
    }

    fn emit_phase(&self, phase: SessionPhase, generation: u64) {
        let _ = self
            .events
            .send(SessionEvent::StateChanged { phase, generation });
    }
}
