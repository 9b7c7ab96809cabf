//! rollcall — camera-based attendance capture engine.
//!
//! Coordinates four asynchronous resources through one state machine:
//! the camera stream, a periodic person-detection loop, a one-shot
//! geolocation fix, and submission to a record store. Hardware and
//! network collaborators are trait seams ([`capability`], [`store`])
//! supplied by the host application.
//!
//! Note on verification strength: the presence signal says "a
//! person-class object is in frame", not "this specific person is in
//! frame". The engine provides presence plausibility, not biometric
//! identity verification.

pub mod camera;
pub mod capability;
pub mod config;
pub mod detection;
pub mod error;
pub mod location;
pub mod models;
pub mod session;
pub mod settings;
pub mod store;
pub mod utils;

pub use camera::{CameraManager, Frame, StreamConstraints};
pub use capability::{CameraDevice, CameraStream, Detector, LocationProvider};
pub use config::CaptureConfig;
pub use detection::{BoundingBox, Detection, PresenceSignal};
pub use error::{
    CameraError, DetectionError, ErrorInfo, ErrorKind, LocationError, SessionError, StoreError,
};
pub use models::{AttendanceRecord, AttendanceStats, DeviceInfo, GeoFix, SubjectIdentity};
pub use session::{CaptureState, SessionController, SessionEvent, SessionPhase};
pub use settings::SettingsStore;
pub use store::{RecordStore, SqliteStore};
