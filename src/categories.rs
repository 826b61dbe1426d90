use crate::db::Database;
use crate::errors::AppResult;
use crate::models::TrackerCategory;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type CategoryListener = Box<dyn Fn() + Send>;

/// Category surface over the shared database handle.
///
/// Mutations emit a coarse changed signal; subscribers re-read whatever view
/// they maintain. Listeners run on the mutating thread and must not call back
/// into the store.
pub struct CategoryStore {
    db: Arc<Database>,
    listeners: Mutex<Vec<CategoryListener>>,
}

impl CategoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn on_change(&self, listener: CategoryListener) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => tracing::warn!("category listener list poisoned; listener dropped"),
        }
    }

    /// Creates a category with a fresh id. Names are unique; a clash fails
    /// without touching the stored set.
    pub fn add_category(&self, name: &str) -> AppResult<TrackerCategory> {
        let category = self.db.insert_category(name)?;
        self.notify();
        Ok(category)
    }

    /// Renames in place: the category keeps its id and its trackers.
    pub fn rename_category(&self, id: Uuid, new_name: &str) -> AppResult<TrackerCategory> {
        let category = self.db.rename_category(id, new_name)?;
        self.notify();
        Ok(category)
    }

    /// Deletes the category together with its trackers and their completion
    /// records.
    pub fn delete_category(&self, id: Uuid) -> AppResult<()> {
        self.db.delete_category(id)?;
        self.notify();
        Ok(())
    }

    pub fn list_categories(&self) -> AppResult<Vec<TrackerCategory>> {
        self.db.list_categories()
    }

    pub fn count_categories(&self) -> AppResult<i64> {
        self.db.count_categories()
    }

    pub fn category_named(&self, name: &str) -> AppResult<Option<TrackerCategory>> {
        self.db.get_category_by_name(name)
    }

    fn notify(&self) {
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(_) => {
                tracing::warn!("category listener list poisoned; skipping notification");
                return;
            }
        };
        for listener in listeners.iter() {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryStore;
    use crate::db::Database;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn store() -> (tempfile::TempDir, CategoryStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        (dir, CategoryStore::new(Arc::new(db)))
    }

    #[test]
    fn add_and_lookup_by_name() {
        let (_dir, store) = store();
        let created = store.add_category("Health").expect("add");

        let found = store
            .category_named("Health")
            .expect("lookup")
            .expect("exists");
        assert_eq!(found.id, created.id);
        assert!(store.category_named("health").expect("lookup").is_none());
    }

    #[test]
    fn each_successful_mutation_signals_once() {
        let (_dir, store) = store();
        let signals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&signals);
        store.on_change(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let category = store.add_category("Health").expect("add");
        assert_eq!(signals.load(Ordering::SeqCst), 1);

        store.rename_category(category.id, "Wellness").expect("rename");
        assert_eq!(signals.load(Ordering::SeqCst), 2);

        store.delete_category(category.id).expect("delete");
        assert_eq!(signals.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_mutation_does_not_signal() {
        let (_dir, store) = store();
        store.add_category("Health").expect("add");

        let signals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&signals);
        store.on_change(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let error = store.add_category("Health").expect_err("duplicate");
        assert!(matches!(error, AppError::DuplicateName(_)));
        assert_eq!(signals.load(Ordering::SeqCst), 0);
        assert_eq!(store.count_categories().expect("count"), 1);
    }
}
