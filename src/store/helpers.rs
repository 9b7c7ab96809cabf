use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Normalize a stored RFC 3339 string into the one timestamp type the
/// rest of the crate uses. Downstream code never branches on the raw
/// representation.
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let parsed = parse_datetime("2026-03-01T10:30:00+05:30", "capturedAt").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T05:00:00+00:00");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_datetime("not-a-date", "capturedAt").is_err());
    }
}
