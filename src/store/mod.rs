//! Record store boundary.
//!
//! The workflow only depends on the [`RecordStore`] trait; the bundled
//! SQLite implementation stands in for whatever document database the
//! host deploys against.

mod connection;
mod helpers;
mod migrations;
mod records;

pub use connection::SqliteStore;

use std::future::Future;

use crate::error::StoreError;
use crate::models::{AttendanceRecord, AttendanceStats};

pub trait RecordStore: Send + Sync + 'static {
    /// Append one attendance record; returns the store-assigned id.
    fn append(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// All records for a subject, newest first.
    fn records_for_subject(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send;

    /// History aggregates for a subject.
    fn stats_for_subject(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<AttendanceStats, StoreError>> + Send;
}
