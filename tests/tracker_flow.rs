use chrono::{NaiveDate, NaiveDateTime, Weekday};
use std::sync::Arc;
use tracker_core::{
    CategoryStore, Color, Database, RecordStore, RowPosition, Tracker, TrackerFilter,
    TrackerListUpdate, TrackerStore,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}

fn noon(raw: &str) -> NaiveDateTime {
    day(raw).and_hms_opt(12, 0, 0).expect("time")
}

fn filter_on(raw: &str) -> TrackerFilter {
    TrackerFilter {
        search_text: None,
        reference_date: day(raw),
    }
}

#[test]
fn habit_lifecycle_from_creation_to_completion() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(Database::new(&dir.path().join("tracker.db")).expect("db"));
    let categories = CategoryStore::new(Arc::clone(&db));
    let trackers = TrackerStore::new(Arc::clone(&db)).expect("store");
    let records = RecordStore::new(Arc::clone(&db));

    categories.add_category("Health").expect("add category");

    let water = Tracker::new(
        "Drink water",
        Color { r: 0x2F, g: 0xD0, b: 0x58 },
        "💧",
        Some([Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect()),
    );
    trackers.add_tracker(&water, "Health").expect("add tracker");

    // 2024-05-01 is a Wednesday, one of the scheduled days
    trackers.set_filter(filter_on("2024-05-01")).expect("filter");
    assert_eq!(trackers.section_count(), 1);
    assert_eq!(trackers.section_title(0).as_deref(), Some("Health"));
    assert_eq!(trackers.row_count(0), 1);
    assert_eq!(trackers.tracker_at(0, 0).expect("tracker").name, "Drink water");

    // completing twice lands back on not-completed; a third tap completes
    assert!(records.toggle(water.id, noon("2024-05-01")).expect("toggle"));
    assert!(!records.toggle(water.id, noon("2024-05-01")).expect("toggle"));
    assert!(records.toggle(water.id, noon("2024-05-01")).expect("toggle"));
    assert_eq!(records.completed_count(water.id).expect("count"), 1);
    assert!(records
        .is_completed_on(water.id, noon("2024-05-01"))
        .expect("lookup"));

    // Thursday is not scheduled, so the whole list is empty
    trackers.set_filter(filter_on("2024-05-02")).expect("filter");
    assert!(trackers.is_empty());
    assert_eq!(trackers.section_count(), 0);

    db.checkpoint().expect("checkpoint");
}

#[test]
fn state_survives_a_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tracker.db");

    let read = Tracker::new("Read", Color { r: 0x8D, g: 0x72, b: 0xE1 }, "📖", None);
    {
        let db = Arc::new(Database::new(&path).expect("db"));
        let trackers = TrackerStore::new(Arc::clone(&db)).expect("store");
        let records = RecordStore::new(Arc::clone(&db));

        trackers.add_tracker(&read, "Evenings").expect("add tracker");
        records.toggle(read.id, noon("2024-05-01")).expect("toggle");
        db.update_settings(serde_json::json!({ "onboardingCompleted": true }))
            .expect("settings");
        db.checkpoint().expect("checkpoint");
    }

    let db = Arc::new(Database::new(&path).expect("db"));
    let trackers = TrackerStore::new(Arc::clone(&db)).expect("store");
    let records = RecordStore::new(Arc::clone(&db));

    trackers.set_filter(filter_on("2024-05-03")).expect("filter");
    assert_eq!(trackers.section_title(0).as_deref(), Some("Evenings"));
    let loaded = trackers.tracker_at(0, 0).expect("tracker");
    assert_eq!(loaded.id, read.id);
    assert_eq!(loaded.color, read.color);
    assert_eq!(loaded.schedule, None);
    assert_eq!(records.completed_count(read.id).expect("count"), 1);
    assert!(db.get_settings().expect("settings").onboarding_completed);
}

#[test]
fn category_deletion_flows_into_the_visible_list() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(Database::new(&dir.path().join("tracker.db")).expect("db"));
    let categories = CategoryStore::new(Arc::clone(&db));
    let trackers = Arc::new(TrackerStore::new(Arc::clone(&db)).expect("store"));
    let records = RecordStore::new(Arc::clone(&db));

    // wire the coarse category signal to a list refresh, the way a UI would
    let subscriber = Arc::clone(&trackers);
    categories.on_change(Box::new(move || {
        subscriber.refresh().expect("refresh");
    }));

    trackers.set_filter(filter_on("2024-05-01")).expect("filter");
    let run = Tracker::new("Run", Color { r: 0xE6, g: 0x3B, b: 0x3B }, "🏃", None);
    trackers.add_tracker(&run, "Health").expect("add tracker");
    records.toggle(run.id, noon("2024-05-01")).expect("toggle");
    assert_eq!(trackers.section_count(), 1);

    let category = categories
        .category_named("Health")
        .expect("get")
        .expect("exists");
    categories.delete_category(category.id).expect("delete");

    assert!(trackers.is_empty());
    assert_eq!(records.completed_count(run.id).expect("count"), 0);
    assert!(records.records_for(run.id).expect("records").is_empty());
}

#[test]
fn search_narrowing_emits_minimal_row_changes() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(Database::new(&dir.path().join("tracker.db")).expect("db"));
    let trackers = TrackerStore::new(Arc::clone(&db)).expect("store");

    trackers.set_filter(filter_on("2024-05-01")).expect("filter");
    let color = Color { r: 0x44, g: 0x44, b: 0x44 };
    trackers
        .add_tracker(&Tracker::new("Oat milk", color, "🥛", None), "Food")
        .expect("add");
    trackers
        .add_tracker(&Tracker::new("Orange juice", color, "🍊", None), "Food")
        .expect("add");
    trackers
        .add_tracker(&Tracker::new("Tea", color, "🍵", None), "Food")
        .expect("add");
    assert_eq!(trackers.row_count(0), 3);

    let updates = std::sync::Mutex::new(Vec::new());
    let updates = Arc::new(updates);
    let sink = Arc::clone(&updates);
    trackers.on_change(Box::new(move |update| {
        sink.lock().expect("sink").push(update.clone());
    }));

    trackers
        .set_filter(TrackerFilter {
            search_text: Some("o".to_string()),
            reference_date: day("2024-05-01"),
        })
        .expect("filter");

    // "Tea" drops out; the two survivors keep their relative order and are
    // not reported as moves
    {
        let updates = updates.lock().expect("sink");
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0],
            TrackerListUpdate {
                deleted_rows: vec![RowPosition { section: 0, row: 2 }],
                ..Default::default()
            }
        );
    }

    trackers.set_filter(filter_on("2024-05-01")).expect("filter");
    let updates = updates.lock().expect("sink");
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[1],
        TrackerListUpdate {
            inserted_rows: vec![RowPosition { section: 0, row: 2 }],
            ..Default::default()
        }
    );
}
