use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::camera::Frame;
use crate::error::ErrorInfo;
use crate::models::GeoFix;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    Starting,
    Live,
    CountingDown,
    Reviewing,
    Submitting,
    Succeeded,
    Failed,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

impl SessionPhase {
    /// Phases during which the camera handle is held.
    pub fn holds_camera(self) -> bool {
        matches!(
            self,
            SessionPhase::Live | SessionPhase::CountingDown
        )
    }
}

/// One end-to-end attempt to mark attendance. Mutated only by the
/// workflow controller; sub-processes report results upward and the
/// controller interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureState {
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    /// Monotonically increasing across sessions and resets; every async
    /// callback compares its captured value against this and no-ops on
    /// mismatch.
    pub generation: u64,
    /// Last known presence reading; only meaningful in `Live` and
    /// `CountingDown`.
    pub subject_present: bool,
    /// Set at most once per session, asynchronously and independently of
    /// phase transitions.
    pub location: Option<GeoFix>,
    /// Present from countdown completion through review/submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_frame: Option<Frame>,
    pub countdown_remaining: u8,
    pub started_at: Option<DateTime<Utc>>,
    /// Last surfaced error; cleared on the next user action.
    pub error: Option<ErrorInfo>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            session_id: None,
            generation: 0,
            subject_present: false,
            location: None,
            captured_frame: None,
            countdown_remaining: 0,
            started_at: None,
            error: None,
        }
    }
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh session: bump the generation and clear everything
    /// else.
    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>) {
        let generation = self.generation + 1;
        *self = Self {
            phase: SessionPhase::Starting,
            session_id: Some(session_id),
            generation,
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    /// Reset to idle, invalidating outstanding callbacks. The location
    /// and frame are discarded with everything else.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}
