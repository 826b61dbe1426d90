use chrono::{Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// RGB color carried by a tracker, persisted as a `#RRGGBB` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Stands in for any stored color that fails to decode.
    pub const FALLBACK: Color = Color { r: 0, g: 0, b: 0 };
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        crate::codec::color_to_hex(value)
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        crate::codec::color_from_hex(&value)
    }
}

/// A habit (recurring, `schedule` is `Some`) or a one-off event (`schedule` is `None`).
///
/// `Some` with an empty set is a habit scheduled for no day at all; it stays
/// distinct from `None` across a persistence round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    pub id: Uuid,
    pub name: String,
    pub color: Color,
    pub emoji: String,
    pub schedule: Option<HashSet<Weekday>>,
}

impl Tracker {
    pub fn new(
        name: impl Into<String>,
        color: Color,
        emoji: impl Into<String>,
        schedule: Option<HashSet<Weekday>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color,
            emoji: emoji.into(),
            schedule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerCategory {
    pub id: Uuid,
    pub name: String,
}

/// One completed day for one tracker. The day is calendar-granular; any
/// intra-day timestamp is truncated before it gets here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub tracker_id: Uuid,
    pub day: NaiveDate,
}

/// Active visibility filter for the tracker list. Both conditions apply
/// conjunctively; an absent or empty search text matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerFilter {
    pub search_text: Option<String>,
    pub reference_date: NaiveDate,
}

impl Default for TrackerFilter {
    fn default() -> Self {
        Self {
            search_text: None,
            reference_date: Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub onboarding_completed: bool,
}

/// Position of a row in the sectioned tracker list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPosition {
    pub section: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMove {
    pub from: RowPosition,
    pub to: RowPosition,
}

/// Batch of list changes produced by one recompute of the visible tracker
/// list.
///
/// Index conventions follow batch table updates: `deleted_sections`,
/// `deleted_rows` and `updated_rows` are positions in the previous snapshot,
/// `inserted_sections` and `inserted_rows` are positions in the new one, and
/// each `RowMove` pairs an old position with a new one. Rows living inside an
/// inserted or deleted section are covered by the section change and are not
/// listed individually.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerListUpdate {
    pub inserted_sections: Vec<usize>,
    pub deleted_sections: Vec<usize>,
    pub inserted_rows: Vec<RowPosition>,
    pub deleted_rows: Vec<RowPosition>,
    pub updated_rows: Vec<RowPosition>,
    pub moved_rows: Vec<RowMove>,
}

impl TrackerListUpdate {
    pub fn is_empty(&self) -> bool {
        self.inserted_sections.is_empty()
            && self.deleted_sections.is_empty()
            && self.inserted_rows.is_empty()
            && self.deleted_rows.is_empty()
            && self.updated_rows.is_empty()
            && self.moved_rows.is_empty()
    }
}
