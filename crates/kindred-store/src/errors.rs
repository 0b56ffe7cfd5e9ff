//! Error handling for kindred-store
//!
//! Wraps kindred-core ExError with store-specific helpers. Every storage
//! failure names the child table and the phase it happened in.

use kindred_core::errors::{ExError, ExErrorKind};
use kindred_core_types::schema::{OP_CHILD_LOAD, OP_CHILD_SYNC, OP_MIGRATE_COLUMNS, PHASE_LOAD, PHASE_SCHEMA};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Reading or extending a child table's column set failed
pub fn schema_migration_failure(table: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::SchemaMigrationFailure)
        .with_op(OP_MIGRATE_COLUMNS)
        .with_table(table)
        .with_phase(PHASE_SCHEMA)
        .with_message(format!("Schema migration of {} failed: {}", table, err))
        .with_source(from_rusqlite(err))
}

/// An insert/update/delete statement against a child table failed
pub fn sync_failure(table: &str, phase: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::SyncFailure)
        .with_op(OP_CHILD_SYNC)
        .with_table(table)
        .with_phase(phase)
        .with_message(format!("{} of {} failed: {}", phase, table, err))
        .with_source(from_rusqlite(err))
}

/// Querying a child table during a parent load failed
pub fn load_failure(table: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::LoadFailure)
        .with_op(OP_CHILD_LOAD)
        .with_table(table)
        .with_phase(PHASE_LOAD)
        .with_message(format!("Loading {} failed: {}", table, err))
        .with_source(from_rusqlite(err))
}

/// Create a configuration error
pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("store_config")
        .with_message(reason)
}
