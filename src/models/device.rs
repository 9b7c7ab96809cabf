//! Device stamp attached to every attendance record.

use chrono::Local;
use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Identifies the capturing software and host OS, in the manner of a
    /// browser user-agent string.
    pub user_agent: String,
    /// Local UTC offset at collection time, e.g. `+05:30`.
    pub timezone: String,
}

impl DeviceInfo {
    /// Collect a stamp for the current host.
    pub fn collect() -> Self {
        let os = System::name().unwrap_or_else(|| "unknown".into());
        let os_version = System::os_version().unwrap_or_else(|| "unknown".into());
        let host = System::host_name().unwrap_or_else(|| "unknown".into());

        Self {
            user_agent: format!(
                "rollcall/{} ({os} {os_version}; {host})",
                env!("CARGO_PKG_VERSION")
            ),
            timezone: Local::now().format("%:z").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_produces_non_empty_fields() {
        let info = DeviceInfo::collect();
        assert!(info.user_agent.starts_with("rollcall/"));
        // RFC 3339 style offset: sign, two digits, colon, two digits.
        assert_eq!(info.timezone.len(), 6);
        assert!(info.timezone.starts_with('+') || info.timezone.starts_with('-'));
    }
}
