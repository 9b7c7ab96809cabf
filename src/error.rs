//! Error taxonomy for the capture engine.
//!
//! Every collaborator failure is converted into one of these types at its
//! boundary; nothing propagates out of the engine as a panic or an
//! untyped error. Only camera-open failures and submission failures are
//! meant to be surfaced to the user as blocking messages; everything else
//! is a soft signal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures opening or reading the video capture device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no capture device found")]
    DeviceNotFound,
    #[error("capture device error: {0}")]
    Device(String),
}

/// Failures from the detection capability. A per-tick failure is logged
/// and swallowed by the detection loop; only a missing capability changes
/// behavior (degraded mode).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    #[error("detection capability unavailable")]
    Unavailable,
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Failures acquiring a geolocation fix. All of these are non-fatal to a
/// session; the sentinel location is substituted at submission time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("geolocation not supported on this device")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location fix timed out")]
    Timeout,
}

/// Failures from the record store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store backend failure: {0}")]
    Backend(String),
}

/// Workflow-level errors returned by [`SessionController`] operations.
///
/// [`SessionController`]: crate::session::SessionController
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("subject not present in frame; capture is gated")]
    SubjectNotPresent,
    #[error("operation not valid in the current session state")]
    InvalidState,
    #[error("submission failed: {0}")]
    Submission(#[from] StoreError),
}

/// Flattened error payload carried in session state and events, so UI
/// consumers never branch on the full taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    PermissionDenied,
    DeviceNotFound,
    DeviceError,
    DetectionUnavailable,
    LocationUnavailable,
    SubmissionFailed,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&CameraError> for ErrorInfo {
    fn from(err: &CameraError) -> Self {
        let kind = match err {
            CameraError::PermissionDenied => ErrorKind::PermissionDenied,
            CameraError::DeviceNotFound => ErrorKind::DeviceNotFound,
            CameraError::Device(_) => ErrorKind::DeviceError,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<&DetectionError> for ErrorInfo {
    fn from(err: &DetectionError) -> Self {
        Self::new(ErrorKind::DetectionUnavailable, err.to_string())
    }
}

impl From<&LocationError> for ErrorInfo {
    fn from(err: &LocationError) -> Self {
        Self::new(ErrorKind::LocationUnavailable, err.to_string())
    }
}

impl From<&StoreError> for ErrorInfo {
    fn from(err: &StoreError) -> Self {
        Self::new(ErrorKind::SubmissionFailed, err.to_string())
    }
}
