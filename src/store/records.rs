use anyhow::Result;
use chrono::{Datelike, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AttendanceRecord, AttendanceStats, DeviceInfo, GeoFix};

use super::connection::SqliteStore;
use super::helpers::parse_datetime;
use super::RecordStore;

fn row_to_record(row: &Row) -> Result<AttendanceRecord> {
    let captured_at: String = row.get("captured_at")?;
    let verified: i64 = row.get("verified")?;

    Ok(AttendanceRecord {
        id: Some(row.get("id")?),
        subject_id: row.get("subject_id")?,
        subject_name: row.get("subject_name")?,
        email: row.get("email")?,
        captured_at: parse_datetime(&captured_at, "captured_at")?,
        location: GeoFix {
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            accuracy: row.get("accuracy")?,
        },
        verified: verified != 0,
        photo: row.get("photo")?,
        device: DeviceInfo {
            user_agent: row.get("user_agent")?,
            timezone: row.get("timezone")?,
        },
    })
}

impl SqliteStore {
    pub async fn insert_record(&self, record: &AttendanceRecord) -> Result<String> {
        let record_id = record
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = record.clone();
        let id_for_insert = record_id.clone();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attendance_records
                     (id, subject_id, subject_name, email, captured_at,
                      latitude, longitude, accuracy, verified, photo,
                      user_agent, timezone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id_for_insert,
                    record.subject_id,
                    record.subject_name,
                    record.email,
                    record.captured_at.to_rfc3339(),
                    record.location.latitude,
                    record.location.longitude,
                    record.location.accuracy,
                    record.verified as i64,
                    record.photo,
                    record.device.user_agent,
                    record.device.timezone,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(record_id)
    }

    pub async fn list_records(&self, subject_id: &str) -> Result<Vec<AttendanceRecord>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, subject_name, email, captured_at,
                        latitude, longitude, accuracy, verified, photo,
                        user_agent, timezone
                 FROM attendance_records
                 WHERE subject_id = ?1
                 ORDER BY captured_at DESC",
            )?;

            let mut rows = stmt.query(params![subject_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }

            Ok(records)
        })
        .await
    }

    pub async fn compute_stats(&self, subject_id: &str) -> Result<AttendanceStats> {
        let subject_id = subject_id.to_string();
        let timestamps = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT captured_at FROM attendance_records
                     WHERE subject_id = ?1
                     ORDER BY captured_at DESC",
                )?;

                let mut rows = stmt.query(params![subject_id])?;
                let mut timestamps = Vec::new();
                while let Some(row) = rows.next()? {
                    timestamps.push(parse_datetime(&row.get::<_, String>(0)?, "captured_at")?);
                }
                Ok(timestamps)
            })
            .await?;

        Ok(stats_from_timestamps(&timestamps))
    }
}

fn stats_from_timestamps(timestamps: &[chrono::DateTime<Utc>]) -> AttendanceStats {
    if timestamps.is_empty() {
        return AttendanceStats {
            total_days_marked: 0,
            attendance_percentage: 0.0,
            last_marked: None,
        };
    }

    let unique_days: std::collections::HashSet<_> =
        timestamps.iter().map(|ts| ts.date_naive()).collect();
    let total_days_marked = unique_days.len() as u64;

    let days_elapsed = Utc::now().ordinal() as f64;
    let percentage = (total_days_marked as f64 / days_elapsed) * 100.0;

    AttendanceStats {
        total_days_marked,
        attendance_percentage: (percentage * 10.0).round() / 10.0,
        last_marked: timestamps.iter().max().copied(),
    }
}

impl RecordStore for SqliteStore {
    async fn append(&self, record: &AttendanceRecord) -> Result<String, StoreError> {
        self.insert_record(record)
            .await
            .map_err(|err| StoreError::Backend(err.to_string()))
    }

    async fn records_for_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.list_records(subject_id)
            .await
            .map_err(|err| StoreError::Backend(err.to_string()))
    }

    async fn stats_for_subject(&self, subject_id: &str) -> Result<AttendanceStats, StoreError> {
        self.compute_stats(subject_id)
            .await
            .map_err(|err| StoreError::Backend(err.to_string()))
    }
}
