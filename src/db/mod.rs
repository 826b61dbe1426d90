use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, CompletionRecord, Tracker, TrackerCategory};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Storage(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Forces the WAL into the main database file so everything sits in one
    /// durable file on disk.
    pub fn checkpoint(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let busy: i64 = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))?;
        if busy != 0 {
            tracing::warn!(path = %self.db_path.display(), "wal checkpoint could not complete; readers still active");
        }
        Ok(())
    }

    // ─── Categories ─────────────────────────────────────────────────────────

    pub fn insert_category(&self, name: &str) -> AppResult<TrackerCategory> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let existing: i64 = conn.query_row(
            "SELECT COUNT(1) FROM categories WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(AppError::DuplicateName(format!(
                "category '{}' already exists",
                name
            )));
        }

        let category = TrackerCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        conn.execute(
            "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![category.id.to_string(), category.name, Utc::now().to_rfc3339()],
        )?;
        Ok(category)
    }

    /// Renames in place so the category id and every tracker attached to it
    /// survive the edit.
    pub fn rename_category(&self, id: Uuid, new_name: &str) -> AppResult<TrackerCategory> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let clash = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                [new_name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        if clash.map(|existing| existing != id.to_string()).unwrap_or(false) {
            return Err(AppError::DuplicateName(format!(
                "category '{}' already exists",
                new_name
            )));
        }

        let changed = conn.execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![new_name, id.to_string()],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("category {} does not exist", id)));
        }
        Ok(TrackerCategory {
            id,
            name: new_name.to_string(),
        })
    }

    pub fn delete_category(&self, id: Uuid) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("category {} does not exist", id)));
        }
        Ok(())
    }

    pub fn list_categories(&self) -> AppResult<Vec<TrackerCategory>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], parse_category_row)?;

        let mut categories = Vec::new();
        for category in rows {
            categories.push(category?);
        }
        Ok(categories)
    }

    pub fn count_categories(&self) -> AppResult<i64> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count = conn.query_row("SELECT COUNT(1) FROM categories", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_category_by_name(&self, name: &str) -> AppResult<Option<TrackerCategory>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let category = conn
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?1",
                [name],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    // ─── Trackers ───────────────────────────────────────────────────────────

    /// Inserts a tracker under the named category, creating the category on
    /// the fly when no category with that exact name exists yet.
    pub fn insert_tracker(&self, tracker: &Tracker, category_name: &str) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let schedule = tracker
            .schedule
            .as_ref()
            .map(|days| codec::schedule_to_string(days));

        let mut conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let tx = conn.transaction()?;
        let category_id = match tx
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                [category_name],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
                    params![id, category_name, now],
                )?;
                id
            }
        };

        tx.execute(
            "INSERT INTO trackers (id, name, color, emoji, schedule, category_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tracker.id.to_string(),
                tracker.name,
                codec::color_to_hex(tracker.color),
                tracker.emoji,
                schedule,
                category_id,
                now,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Updates name, color, emoji and schedule. The tracker stays in its
    /// category.
    pub fn update_tracker(&self, tracker: &Tracker) -> AppResult<()> {
        let schedule = tracker
            .schedule
            .as_ref()
            .map(|days| codec::schedule_to_string(days));

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let changed = conn.execute(
            "UPDATE trackers SET name = ?1, color = ?2, emoji = ?3, schedule = ?4 WHERE id = ?5",
            params![
                tracker.name,
                codec::color_to_hex(tracker.color),
                tracker.emoji,
                schedule,
                tracker.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "tracker {} does not exist",
                tracker.id
            )));
        }
        Ok(())
    }

    pub fn delete_tracker(&self, id: Uuid) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let deleted = conn.execute("DELETE FROM trackers WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("tracker {} does not exist", id)));
        }
        Ok(())
    }

    /// Returns every tracker joined to its category name, ordered by category
    /// name, then tracker name, then id so list building stays deterministic.
    pub fn list_trackers_with_categories(&self) -> AppResult<Vec<(String, Tracker)>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.color, t.emoji, t.schedule, c.name
             FROM trackers t
             JOIN categories c ON c.id = t.category_id
             ORDER BY c.name ASC, t.name ASC, t.id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let tracker = parse_tracker_row(row)?;
            let category: String = row.get(5)?;
            Ok((category, tracker))
        })?;

        let mut trackers = Vec::new();
        for tracker in rows {
            trackers.push(tracker?);
        }
        Ok(trackers)
    }

    // ─── Completion records ─────────────────────────────────────────────────

    /// Flips the completion state for one tracker on one day and reports the
    /// new state. Toggling an unknown tracker is a not-found error rather
    /// than an orphan row.
    pub fn toggle_record(&self, tracker_id: Uuid, day: NaiveDate) -> AppResult<bool> {
        let mut conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let tx = conn.transaction()?;
        let existing: i64 = tx.query_row(
            "SELECT COUNT(1) FROM completion_records WHERE tracker_id = ?1 AND day = ?2",
            params![tracker_id.to_string(), day],
            |row| row.get(0),
        )?;

        let completed = if existing > 0 {
            tx.execute(
                "DELETE FROM completion_records WHERE tracker_id = ?1 AND day = ?2",
                params![tracker_id.to_string(), day],
            )?;
            false
        } else {
            tx.execute(
                "INSERT INTO completion_records (tracker_id, day) VALUES (?1, ?2)",
                params![tracker_id.to_string(), day],
            )
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    AppError::NotFound(format!("tracker {} does not exist", tracker_id))
                }
                other => AppError::from(other),
            })?;
            true
        };
        tx.commit()?;
        Ok(completed)
    }

    pub fn count_records(&self, tracker_id: Uuid) -> AppResult<i64> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM completion_records WHERE tracker_id = ?1",
            [tracker_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn has_record(&self, tracker_id: Uuid, day: NaiveDate) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM completion_records WHERE tracker_id = ?1 AND day = ?2",
            params![tracker_id.to_string(), day],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_records(&self, tracker_id: Uuid) -> AppResult<Vec<CompletionRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT tracker_id, day FROM completion_records WHERE tracker_id = ?1 ORDER BY day ASC",
        )?;
        let rows = stmt.query_map([tracker_id.to_string()], |row| {
            Ok(CompletionRecord {
                tracker_id: parse_uuid(&row.get::<_, String>(0)?)?,
                day: row.get(1)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    // ─── Settings ───────────────────────────────────────────────────────────

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<AppSettings>(&raw).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)?;

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        Ok(settings)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&AppSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }
}

fn parse_uuid(raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
        )
    })
}

fn parse_category_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackerCategory> {
    Ok(TrackerCategory {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
    })
}

fn parse_tracker_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tracker> {
    let schedule: Option<String> = row.get(4)?;
    Ok(Tracker {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        color: codec::color_from_hex(&row.get::<_, String>(2)?),
        emoji: row.get(3)?,
        schedule: schedule.map(|raw| codec::schedule_from_string(&raw)),
    })
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
