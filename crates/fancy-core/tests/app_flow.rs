use chrono::Utc;
use fancy_core::persist::{FileKv, load_state, save_state};
use fancy_core::task::{TimeSlot, ViewMode};
use fancy_core::view;
use tempfile::tempdir;

#[test]
fn first_launch_seeds_then_round_trips_mutations() {
    let temp = tempdir().expect("tempdir");
    let mut kv = FileKv::open(temp.path()).expect("open kv store");
    let now = Utc::now();

    // Empty data directory bootstraps the sample set.
    let mut store = load_state(&kv, now);
    assert_eq!(store.tasks().len(), 5);
    assert_eq!(store.categories().len(), 5);
    assert_eq!(store.active_category(), "today");
    assert_eq!(store.view_mode(), ViewMode::Tasks);

    store.set_active_category("work");
    let slot = TimeSlot {
        date: chrono::NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
        start_time: "09:00".to_string(),
        end_time: "11:00".to_string(),
    };
    let id = store
        .create_task(
            "# Sprint review\n\nCollect the demo links",
            None,
            Some(slot),
            now,
        )
        .expect("task created")
        .id
        .clone();
    assert!(store.toggle_completion(&id));

    assert!(store.take_dirty());
    save_state(&mut kv, &store);

    let reloaded = load_state(&kv, now);
    assert_eq!(reloaded.tasks(), store.tasks());
    assert_eq!(reloaded.categories(), store.categories());
    assert_eq!(reloaded.active_category(), "work");

    let added = reloaded
        .tasks()
        .iter()
        .find(|task| task.id == id)
        .expect("added task survives reload");
    assert!(added.completed);
    assert_eq!(added.category, "work");
    assert_eq!(
        added.scheduled_time.as_ref().map(|s| s.range_label()),
        Some("09:00 - 11:00".to_string())
    );
}

#[test]
fn derived_views_track_the_persisted_store() {
    let temp = tempdir().expect("tempdir");
    let mut kv = FileKv::open(temp.path()).expect("open kv store");
    let now = Utc::now();

    let mut store = load_state(&kv, now);
    store.set_active_category("work");
    store
        .create_task("Draft the quarterly report", None, None, now)
        .expect("task created");
    store.set_view_mode(ViewMode::Dashboard);
    save_state(&mut kv, &store);

    let reloaded = load_state(&kv, now);
    assert_eq!(reloaded.view_mode(), ViewMode::Dashboard);

    let filtered = view::filtered_tasks(reloaded.tasks(), "work", "quarterly");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].title(), "Draft the quarterly report");

    let today = fancy_core::datetime::app_date(now);
    let stats = view::stats(reloaded.tasks(), today);
    assert_eq!(stats.total, 6);
    assert_eq!(stats.pending + stats.completed + stats.in_progress, stats.total);

    // The new task got a default now-to-now+1h slot, so it shows up in
    // the calendar cell for its start hour.
    let hour = fancy_core::datetime::app_hour(now);
    let in_slot = view::tasks_for_time_slot(reloaded.tasks(), hour, today);
    assert!(
        in_slot
            .iter()
            .any(|task| task.title() == "Draft the quarterly report")
    );
}
