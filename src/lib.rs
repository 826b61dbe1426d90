mod categories;
mod codec;
mod db;
mod diff;
mod errors;
mod models;
mod records;
mod trackers;

pub use crate::categories::CategoryStore;
pub use crate::codec::{color_from_hex, color_to_hex, schedule_from_string, schedule_to_string};
pub use crate::db::Database;
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{
    AppSettings, Color, CompletionRecord, RowMove, RowPosition, Tracker, TrackerCategory,
    TrackerFilter, TrackerListUpdate,
};
pub use crate::records::RecordStore;
pub use crate::trackers::TrackerStore;
