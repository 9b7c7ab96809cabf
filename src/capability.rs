//! Collaborator seams the host application plugs into the engine.
//!
//! The engine does not talk to hardware or the network directly; it drives
//! these traits. Implementations are expected to be blocking — the engine
//! moves inference onto the blocking pool and bounds location calls with a
//! timeout itself.

use crate::camera::{Frame, StreamConstraints};
use crate::detection::Detection;
use crate::error::{CameraError, DetectionError, LocationError};
use crate::models::GeoFix;

/// A video capture device. `open` requests a video-only stream honoring
/// the given constraints; audio must never be requested.
pub trait CameraDevice: Send + Sync {
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live video stream. Exactly one owner holds this handle (the camera
/// session manager); detection and still-frame capture read frames through
/// it but never hold it themselves.
pub trait CameraStream: Send {
    /// Grab the most recent frame. `Ok(None)` means the source has no
    /// frame buffered yet; callers skip and retry later.
    fn grab_frame(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Stop every underlying track. Must be idempotent.
    fn stop(&mut self);
}

/// The object-detection capability: given a frame, return labeled boxes
/// with confidences. May be absent entirely (degraded mode).
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;
}

/// One-shot geolocation. The call may block; the engine wraps it in a
/// blocking task bounded by the configured timeout.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self, high_accuracy: bool) -> Result<GeoFix, LocationError>;
}
