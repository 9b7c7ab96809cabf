use serde::Serialize;

use crate::detection::{Detection, PresenceSignal};
use crate::error::ErrorInfo;
use crate::models::{AttendanceRecord, GeoFix};

use super::SessionPhase;

/// Caller-facing events, fanned out over a broadcast channel. Events from
/// sub-processes carry the generation they were produced under so slow
/// consumers can drop stale ones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    StateChanged {
        phase: SessionPhase,
        generation: u64,
    },
    Detections {
        generation: u64,
        signal: PresenceSignal,
        detections: Vec<Detection>,
    },
    CountdownTick {
        generation: u64,
        remaining: u8,
    },
    LocationUpdate {
        generation: u64,
        fix: Option<GeoFix>,
        error: Option<ErrorInfo>,
    },
    SessionSucceeded {
        record_id: String,
        record: AttendanceRecord,
    },
    SessionFailed {
        error: ErrorInfo,
    },
    /// The history view should re-query the store.
    HistoryInvalidated,
}
