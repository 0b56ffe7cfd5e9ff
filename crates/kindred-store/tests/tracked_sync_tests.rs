// Integration tests for tracked collection sync
// Covers round trip, no-op sync, batch shape, end-to-end mutation, and the
// per-phase acknowledgement behavior on failure

mod common;

use common::{bound_lines, count_rows, line, setup_test_db, Line};
use kindred_core::logging_facility::test_capture::init_test_capture;
use kindred_core::{ExErrorKind, TrackedCollection};
use kindred_core_types::schema::{EVENT_END, OP_CHILD_SYNC};
use kindred_store::child::tracked;
use kindred_store::StoreConfig;

#[test]
fn test_round_trip_preserves_fields_and_timestamps() {
    // Given: A line with explicit epoch-ms timestamps
    let mut conn = setup_test_db();
    let mut lines = bound_lines("rt_lines", 7);
    let mut original = line("A-1", 3);
    original.created_at = 1_700_000_000_123;
    original.updated_at = 1_700_000_000_456;
    let id = lines.add(original);

    // When: We sync and load into a fresh collection
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    let mut reloaded = bound_lines("rt_lines", 7);
    let report = tracked::load(&conn, &mut reloaded).unwrap();

    // Then: Every field and both timestamps survive exactly
    assert_eq!(report.rows, 1);
    assert!(report.is_clean());
    let loaded = reloaded.get_by_id(&id).unwrap();
    assert_eq!(loaded, lines.get_by_id(&id).unwrap());
    assert_eq!(loaded.created_at, 1_700_000_000_123);
    assert_eq!(loaded.updated_at, 1_700_000_000_456);
    assert_eq!(loaded.parent_id, 7);
    assert!(!reloaded.is_dirty(), "loaded records start clean");
}

#[test]
fn test_second_sync_without_mutation_issues_no_statements() {
    let mut conn = setup_test_db();
    let mut lines = bound_lines("noop_lines", 1);
    lines.add(line("A", 1));

    let tx = conn.transaction().unwrap();
    let first = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    let second = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    assert!(first.statements() > 0);
    assert_eq!(second.statements(), 0);
    assert!(second.is_noop());
}

#[test]
fn test_unbound_collection_sync_is_noop() {
    let mut conn = setup_test_db();
    let mut lines: TrackedCollection<Line> = TrackedCollection::new();
    lines.add(line("A", 1));

    let tx = conn.transaction().unwrap();
    let report = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();

    assert!(report.is_noop());
    assert!(lines.is_dirty(), "pending changes stay pending until bound");
}

#[test]
fn test_batch_shape_1200_rows() {
    // Given: 1200 added lines
    let mut conn = setup_test_db();
    let mut lines = bound_lines("batch_lines", 3);
    lines.add_range((0..1200).map(|i| line(&format!("SKU-{}", i), i)));

    // When: We sync
    let tx = conn.transaction().unwrap();
    let inserted = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();

    // Then: One multi-row INSERT covers all of them
    assert_eq!(inserted.insert_statements, 1);
    assert_eq!(inserted.inserted, 1200);
    assert_eq!(count_rows(&tx, "batch_lines", 3), 1200);

    // When: We remove them all and sync again
    lines.clear();
    let deleted = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    // Then: Deletes go out in chunks of 500
    assert_eq!(deleted.delete_statements, 3);
    assert_eq!(deleted.deleted, 1200);
    assert_eq!(deleted.insert_statements + deleted.update_statements, 0);
    assert_eq!(count_rows(&conn, "batch_lines", 3), 0);
}

#[test]
fn test_insert_splits_only_past_bind_limit() {
    let mut conn = setup_test_db();
    let mut lines = bound_lines("split_lines", 1);
    lines.add_range((0..25).map(|i| line("S", i)));

    // 7 params per row, so 70 params fit 10 rows
    let config = StoreConfig {
        max_bind_params: 70,
        ..Default::default()
    };

    let tx = conn.transaction().unwrap();
    let report = tracked::sync(&tx, &mut lines, &config).unwrap();
    tx.commit().unwrap();

    assert_eq!(report.insert_statements, 3);
    assert_eq!(count_rows(&conn, "split_lines", 1), 25);
}

#[test]
fn test_end_to_end_add_remove_update_clear() {
    let mut conn = setup_test_db();
    let table = "e2e_lines";
    let mut lines = bound_lines(table, 42);

    // Add(A, B) -> Sync => 2 rows with ParentId = 42
    let a = lines.add(line("A", 1));
    let b = lines.add(line("B", 2));
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();
    assert_eq!(count_rows(&conn, table, 42), 2);

    // Remove(A), Update(B, qty = 99) -> Sync => exactly B with qty 99
    assert!(lines.remove_by_id(&a));
    lines
        .update(Line {
            id: b.clone(),
            sku: "B".to_string(),
            qty: 99,
            ..Default::default()
        })
        .unwrap();
    let tx = conn.transaction().unwrap();
    let report = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.update_statements, 1);
    let rows: Vec<(String, i64)> = conn
        .prepare("SELECT Id, qty FROM e2e_lines WHERE ParentId = 42")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(b.clone(), 99)]);

    // Clear() -> Sync => 0 rows for the parent
    lines.clear();
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();
    assert_eq!(count_rows(&conn, table, 42), 0);
}

#[test]
fn test_update_with_fresh_record_keeps_created_at() {
    // Given: A synced line with a known creation time
    let mut conn = setup_test_db();
    let mut lines = bound_lines("created_lines", 5);
    let mut original = line("A", 1);
    original.created_at = 1_700_000_000_000;
    let id = lines.add(original);
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    // When: It is replaced by a record built from scratch
    lines
        .update(Line {
            id: id.clone(),
            qty: 5,
            ..Default::default()
        })
        .unwrap();
    let tx = conn.transaction().unwrap();
    let report = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();
    assert_eq!(report.updated, 1);

    // Then: CreatedAt and ParentId survive in memory and in the table
    let live = lines.get_by_id(&id).unwrap();
    assert_eq!(live.created_at, 1_700_000_000_000);
    assert_eq!(live.parent_id, 5);

    let mut reloaded = bound_lines("created_lines", 5);
    tracked::load(&conn, &mut reloaded).unwrap();
    let stored = reloaded.get_by_id(&id).unwrap();
    assert_eq!(stored.qty, 5);
    assert_eq!(stored.created_at, 1_700_000_000_000);
    assert!(stored.updated_at >= stored.created_at);
    assert_eq!(stored.parent_id, 5);
}

#[test]
fn test_load_into_collection_with_pending_delete() {
    // Given: A synced line that was then removed in memory
    let mut conn = setup_test_db();
    let mut lines = bound_lines("reload_lines", 2);
    let gone = lines.add(line("gone", 1));
    let kept = lines.add(line("kept", 1));
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();
    lines.remove_by_id(&gone);

    // When: The same collection is reloaded before the next sync
    tracked::load(&conn, &mut lines).unwrap();

    // Then: The removed line stays unreachable and still pending delete
    assert!(!lines.contains(&gone));
    assert_eq!(lines.deleted_ids().collect::<Vec<_>>(), vec![gone.as_str()]);

    // And: After the sync the table mirrors the live map
    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines.contains(&kept));
    assert_eq!(count_rows(&conn, "reload_lines", 2), 1);
}

#[test]
fn test_add_then_remove_before_sync_issues_no_delete() {
    let mut conn = setup_test_db();
    let mut lines = bound_lines("transient_lines", 1);
    let keep = lines.add(line("keep", 1));
    let gone = lines.add(line("gone", 1));
    lines.remove_by_id(&gone);

    let tx = conn.transaction().unwrap();
    let report = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    assert_eq!(report.delete_statements, 0);
    assert_eq!(report.inserted, 1);
    assert!(lines.contains(&keep));
}

#[test]
fn test_sync_rows_mirror_live_map_for_parent_only() {
    let mut conn = setup_test_db();
    let mut first = bound_lines("shared_lines", 1);
    let mut second = bound_lines("shared_lines", 2);
    first.add(line("one", 1));
    second.add(line("two", 2));
    second.add(line("three", 3));

    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut first, &StoreConfig::default()).unwrap();
    tracked::sync(&tx, &mut second, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    let mut reloaded = bound_lines("shared_lines", 2);
    tracked::load(&conn, &mut reloaded).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.iter().all(|l| l.parent_id == 2));
}

#[test]
fn test_failed_update_phase_keeps_insert_acknowledged() {
    // Given: A table whose qty column rejects negatives
    let mut conn = setup_test_db();
    conn.execute(
        "CREATE TABLE check_lines (Id TEXT PRIMARY KEY, ParentId INTEGER, CreatedAt INTEGER, \
         UpdatedAt INTEGER, price REAL, qty INTEGER CHECK (qty >= 0), sku TEXT)",
        [],
    )
    .unwrap();

    let mut lines = bound_lines("check_lines", 1);
    let mut stored = line("old", 1);
    stored.id = "stored".to_string();
    lines.load_from_database(stored);
    lines.modify("stored", |l| l.qty = -5).unwrap();
    lines.add(line("new", 1));

    // When: The update phase fails
    let tx = conn.transaction().unwrap();
    let err = tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap_err();
    drop(tx);

    // Then: The error names table and phase, and the insert set is already cleared
    assert_eq!(err.kind(), ExErrorKind::SyncFailure);
    assert_eq!(err.table(), Some("check_lines"));
    assert_eq!(err.phase(), Some("update"));
    assert_eq!(lines.added_ids().count(), 0);
    assert_eq!(lines.modified_ids().count(), 1);
}

#[test]
fn test_sync_logs_counts() {
    let capture = init_test_capture();
    let mut conn = setup_test_db();
    let mut lines = bound_lines("logged_lines", 1);
    lines.add(line("A", 1));
    lines.add(line("B", 1));

    let tx = conn.transaction().unwrap();
    tracked::sync(&tx, &mut lines, &StoreConfig::default()).unwrap();
    tx.commit().unwrap();

    let events = capture.events_for(OP_CHILD_SYNC, "logged_lines");
    let end = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END))
        .expect("Should have sync end event");
    assert_eq!(end.field_u64("inserted"), Some(2));
    assert_eq!(end.field_u64("deleted"), Some(0));
}
