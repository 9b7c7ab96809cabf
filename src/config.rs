use serde::{Deserialize, Serialize};

use crate::camera::StreamConstraints;

/// Tunable parameters for a capture session.
///
/// Intervals are deliberate trade-offs: polling detection faster than
/// ~200 ms wastes compute, slower degrades the responsiveness of the
/// "ready to capture" signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Detection poll period.
    pub detection_interval_ms: u64,
    /// Label whose presence gates capture.
    pub subject_label: String,
    /// Confidence floor for the presence rule.
    pub min_confidence: f32,
    /// Number of countdown ticks before the still frame is grabbed.
    pub countdown_ticks: u8,
    /// Real-time length of one countdown tick.
    pub countdown_tick_ms: u64,
    /// Upper bound on the one-shot geolocation fix.
    pub location_timeout_ms: u64,
    /// How long the success confirmation stays up before the session
    /// resets to idle.
    pub success_display_ms: u64,
    /// Preferred stream geometry, video only.
    pub camera: StreamConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 250,
            subject_label: "person".into(),
            min_confidence: 0.5,
            countdown_ticks: 3,
            countdown_tick_ms: 1_000,
            location_timeout_ms: 10_000,
            success_display_ms: 3_000,
            camera: StreamConstraints::default(),
        }
    }
}
