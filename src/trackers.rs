use crate::codec;
use crate::db::Database;
use crate::diff::{self, SnapshotRow, SnapshotSection};
use crate::errors::{AppError, AppResult};
use crate::models::{Tracker, TrackerFilter, TrackerListUpdate};
use chrono::Datelike;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

type UpdateListener = Box<dyn Fn(&TrackerListUpdate) + Send>;

#[derive(Debug, Clone)]
struct VisibleSection {
    title: String,
    trackers: Vec<Tracker>,
}

struct ViewState {
    filter: TrackerFilter,
    sections: Vec<VisibleSection>,
}

/// Tracker surface plus the filtered, sectioned view the list UI renders.
///
/// Every mutation and filter change recomputes the visible list, diffs it
/// against the previous one and hands subscribers a single
/// [`TrackerListUpdate`] describing what changed. A recompute that changes
/// nothing emits nothing. Listeners run on the mutating thread and must not
/// call back into the store.
pub struct TrackerStore {
    db: Arc<Database>,
    state: Mutex<ViewState>,
    listeners: Mutex<Vec<UpdateListener>>,
}

impl TrackerStore {
    pub fn new(db: Arc<Database>) -> AppResult<Self> {
        let store = Self {
            db,
            state: Mutex::new(ViewState {
                filter: TrackerFilter::default(),
                sections: Vec::new(),
            }),
            listeners: Mutex::new(Vec::new()),
        };
        store.recompute()?;
        Ok(store)
    }

    pub fn on_change(&self, listener: UpdateListener) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => tracing::warn!("tracker listener list poisoned; listener dropped"),
        }
    }

    /// Stores the tracker under the named category, creating the category
    /// when it does not exist yet.
    pub fn add_tracker(&self, tracker: &Tracker, category_name: &str) -> AppResult<()> {
        self.db.insert_tracker(tracker, category_name)?;
        self.recompute()
    }

    pub fn update_tracker(&self, tracker: &Tracker) -> AppResult<()> {
        self.db.update_tracker(tracker)?;
        self.recompute()
    }

    /// Deletes the tracker and, via the storage layer, its completion
    /// records.
    pub fn delete_tracker(&self, id: Uuid) -> AppResult<()> {
        self.db.delete_tracker(id)?;
        self.recompute()
    }

    pub fn set_filter(&self, filter: TrackerFilter) -> AppResult<()> {
        {
            let mut state = self.state()?;
            state.filter = filter;
        }
        self.recompute()
    }

    pub fn filter(&self) -> TrackerFilter {
        match self.state.lock() {
            Ok(state) => state.filter.clone(),
            Err(_) => {
                tracing::warn!("tracker view state poisoned; returning default filter");
                TrackerFilter::default()
            }
        }
    }

    /// Re-reads the database with the current filter. Callers use this after
    /// out-of-band changes such as category edits.
    pub fn refresh(&self) -> AppResult<()> {
        self.recompute()
    }

    // ─── View accessors ─────────────────────────────────────────────────────

    pub fn section_count(&self) -> usize {
        match self.state.lock() {
            Ok(state) => state.sections.len(),
            Err(_) => 0,
        }
    }

    pub fn section_title(&self, section: usize) -> Option<String> {
        let state = self.state.lock().ok()?;
        state.sections.get(section).map(|found| found.title.clone())
    }

    pub fn row_count(&self, section: usize) -> usize {
        match self.state.lock() {
            Ok(state) => state
                .sections
                .get(section)
                .map(|found| found.trackers.len())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub fn tracker_at(&self, section: usize, row: usize) -> Option<Tracker> {
        let state = self.state.lock().ok()?;
        match state
            .sections
            .get(section)
            .and_then(|found| found.trackers.get(row))
        {
            Some(tracker) => Some(tracker.clone()),
            None => {
                tracing::warn!(section = section, row = row, "tracker requested at missing index");
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.sections.is_empty(),
            Err(_) => true,
        }
    }

    fn recompute(&self) -> AppResult<()> {
        let filter = {
            let state = self.state()?;
            state.filter.clone()
        };
        let rows = self.db.list_trackers_with_categories()?;
        let sections = build_sections(rows, &filter);

        let update = {
            let mut state = self.state()?;
            let before = snapshot(&state.sections);
            let after = snapshot(&sections);
            let update = diff::reconcile(&before, &after);
            state.sections = sections;
            update
        };

        if update.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            inserted_sections = update.inserted_sections.len(),
            deleted_sections = update.deleted_sections.len(),
            inserted_rows = update.inserted_rows.len(),
            deleted_rows = update.deleted_rows.len(),
            updated_rows = update.updated_rows.len(),
            moved_rows = update.moved_rows.len(),
            "visible tracker list changed"
        );
        self.notify(&update);
        Ok(())
    }

    fn state(&self) -> AppResult<MutexGuard<'_, ViewState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("tracker view state poisoned".to_string()))
    }

    fn notify(&self, update: &TrackerListUpdate) {
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(_) => {
                tracing::warn!("tracker listener list poisoned; skipping notification");
                return;
            }
        };
        for listener in listeners.iter() {
            listener(update);
        }
    }
}

/// Applies both filter conditions and groups what survives into sections.
/// Rows arrive ordered by category name then tracker name, so grouping is a
/// single pass; a category with no visible tracker never becomes a section.
fn build_sections(rows: Vec<(String, Tracker)>, filter: &TrackerFilter) -> Vec<VisibleSection> {
    let search = filter
        .search_text
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let weekday = filter.reference_date.weekday();

    let mut sections: Vec<VisibleSection> = Vec::new();
    for (category, tracker) in rows {
        let date_condition = match &tracker.schedule {
            Some(days) => days.contains(&weekday),
            None => true,
        };
        let text_condition = search.is_empty() || tracker.name.to_lowercase().contains(&search);
        if !(date_condition && text_condition) {
            continue;
        }

        match sections.last_mut() {
            Some(section) if section.title == category => section.trackers.push(tracker),
            _ => sections.push(VisibleSection {
                title: category,
                trackers: vec![tracker],
            }),
        }
    }
    sections
}

fn snapshot(sections: &[VisibleSection]) -> Vec<SnapshotSection> {
    sections
        .iter()
        .map(|section| SnapshotSection {
            title: section.title.clone(),
            rows: section
                .trackers
                .iter()
                .map(|tracker| SnapshotRow {
                    id: tracker.id,
                    fingerprint: fingerprint(tracker),
                })
                .collect(),
        })
        .collect()
}

fn fingerprint(tracker: &Tracker) -> u64 {
    let mut hasher = DefaultHasher::new();
    tracker.name.hash(&mut hasher);
    codec::color_to_hex(tracker.color).hash(&mut hasher);
    tracker.emoji.hash(&mut hasher);
    tracker.schedule.is_some().hash(&mut hasher);
    if let Some(days) = &tracker.schedule {
        codec::schedule_to_string(days).hash(&mut hasher);
    }
    hasher.finish()
}
