mod device;
mod record;

pub use device::DeviceInfo;
pub use record::{AttendanceRecord, AttendanceStats, GeoFix, SubjectIdentity};
