use crate::db::Database;
use crate::errors::AppResult;
use crate::models::CompletionRecord;
use chrono::NaiveDateTime;
use std::sync::Arc;
use uuid::Uuid;

/// Completion record surface. Timestamps are truncated to their calendar day
/// before any lookup or write, so at most one record exists per tracker and
/// day, and a morning toggle cancels an evening one.
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Marks the day completed if it is not, clears it if it is, and returns
    /// the new state.
    pub fn toggle(&self, tracker_id: Uuid, at: NaiveDateTime) -> AppResult<bool> {
        self.db.toggle_record(tracker_id, at.date())
    }

    pub fn is_completed_on(&self, tracker_id: Uuid, at: NaiveDateTime) -> AppResult<bool> {
        self.db.has_record(tracker_id, at.date())
    }

    /// Total completed days over the tracker's lifetime.
    pub fn completed_count(&self, tracker_id: Uuid) -> AppResult<i64> {
        self.db.count_records(tracker_id)
    }

    pub fn records_for(&self, tracker_id: Uuid) -> AppResult<Vec<CompletionRecord>> {
        self.db.list_records(tracker_id)
    }
}
