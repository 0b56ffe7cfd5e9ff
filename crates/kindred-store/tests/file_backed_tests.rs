// Integration tests for collections saved through their own connection string

mod common;

use common::{line, Line};
use kindred_core::TrackedCollection;
use kindred_store::child::tracked;
use kindred_store::{db, StoreConfig};
use tempfile::TempDir;

#[test]
fn test_save_opens_bound_connection_string() {
    // Given: A collection bound to a file database via a Data Source string
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kindred.db");
    let connection_string = format!("Data Source={}", path.display());

    let mut lines: TrackedCollection<Line> = TrackedCollection::new();
    lines.bind(&connection_string, 8, "file_lines");
    let id = lines.add(line("A", 4));

    // When: The collection saves itself
    let report = tracked::save(&mut lines, &StoreConfig::default()).unwrap();
    assert_eq!(report.inserted, 1);
    assert!(!lines.is_dirty());

    // Then: A separate connection sees the committed row
    let conn = db::open(&path).unwrap();
    let mut reloaded: TrackedCollection<Line> = TrackedCollection::new();
    reloaded.bind(&connection_string, 8, "file_lines");
    tracked::load(&conn, &mut reloaded).unwrap();

    assert_eq!(reloaded.get_by_id(&id).unwrap().qty, 4);
}

#[test]
fn test_save_of_clean_collection_opens_nothing() {
    // Bound to a path that cannot be opened, but nothing is pending
    let mut lines: TrackedCollection<Line> = TrackedCollection::new();
    lines.bind("Data Source=/nonexistent/dir/x.db", 1, "never");

    let report = tracked::save(&mut lines, &StoreConfig::default()).unwrap();
    assert!(report.is_noop());
}

#[test]
fn test_save_reports_unopenable_database() {
    let mut lines: TrackedCollection<Line> = TrackedCollection::new();
    lines.bind("Data Source=/nonexistent/dir/x.db", 1, "never");
    lines.add(line("A", 1));

    assert!(tracked::save(&mut lines, &StoreConfig::default()).is_err());
    assert!(lines.is_dirty());
}
