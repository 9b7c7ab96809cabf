//! Periodic person-detection over the live camera stream.
//!
//! The loop polls the current frame at a fixed interval, runs the
//! detection capability once per tick, and publishes a presence signal
//! plus the raw detection list for overlay rendering. With no detector
//! configured it runs degraded: frame availability stands in for
//! presence (fail open — a weaker guarantee, but the subject is never
//! locked out of marking attendance by a missing model).

mod controller;
mod loop_worker;
mod overlay;

pub use controller::DetectionController;
pub use overlay::render_overlay;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detection from a single inference pass. Ephemeral: consumed to
/// update the presence signal and the overlay, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Latest presence reading, published through a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSignal {
    pub subject_present: bool,
    /// False while running degraded (no detector); the signal then only
    /// reflects frame availability, not an actual detection.
    pub detector_backed: bool,
}

/// Presence rule: at least one detection carries the expected label at or
/// above the confidence floor.
pub fn subject_present(detections: &[Detection], label: &str, min_confidence: f32) -> bool {
    detections
        .iter()
        .any(|d| d.label == label && d.confidence >= min_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.into(),
            confidence,
            bounding_box: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
        }
    }

    #[test]
    fn presence_requires_expected_label() {
        let detections = vec![det("chair", 0.99), det("dog", 0.8)];
        assert!(!subject_present(&detections, "person", 0.5));

        let detections = vec![det("chair", 0.99), det("person", 0.8)];
        assert!(subject_present(&detections, "person", 0.5));
    }

    #[test]
    fn presence_honors_confidence_floor() {
        let detections = vec![det("person", 0.3)];
        assert!(!subject_present(&detections, "person", 0.5));
        assert!(subject_present(&detections, "person", 0.3));
    }

    #[test]
    fn empty_result_means_absent() {
        assert!(!subject_present(&[], "person", 0.5));
    }
}
