//! Attendance record data models.
//!
//! `AttendanceRecord` is the durable artifact written to the record store
//! on a successful session. It is assembled once, at submission time, and
//! never mutated after the store accepts it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeviceInfo;

/// The person whose attendance is being marked. Injected into the
/// workflow at construction; the engine never reads ambient user state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectIdentity {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

/// A geolocation fix. `{0,0}` is the sentinel for "no fix acquired";
/// callers that need to distinguish the two should check `is_sentinel`
/// (a real equator/meridian reading is indistinguishable by design — the
/// record shape is kept compatible with the existing store).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

impl GeoFix {
    pub const SENTINEL: GeoFix = GeoFix {
        latitude: 0.0,
        longitude: 0.0,
        accuracy: None,
    };

    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0 && self.accuracy.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Store-assigned id; `None` until the record has been appended.
    pub id: Option<String>,
    pub subject_id: String,
    pub subject_name: String,
    pub email: String,
    /// Assigned at submission time, not at frame-capture time.
    pub captured_at: DateTime<Utc>,
    pub location: GeoFix,
    pub verified: bool,
    /// Encoded still frame from the review step, when one was retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
    pub device: DeviceInfo,
}

/// Aggregates over a subject's history, computed at the store boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    /// Distinct calendar days with at least one record.
    pub total_days_marked: u64,
    /// `total_days_marked` over days elapsed this year, as a percentage.
    pub attendance_percentage: f64,
    pub last_marked: Option<DateTime<Utc>>,
}
