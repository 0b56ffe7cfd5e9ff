//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::config::StoreConfig;
use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const DATA_SOURCE_PREFIX: &str = "Data Source=";

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Open the database named by a connection string
///
/// Accepts a bare path or `Data Source=<path>`; `:memory:` opens a private
/// in-memory database.
pub fn open_connection_string(connection_string: &str) -> Result<Connection> {
    let path = connection_string
        .trim()
        .strip_prefix(DATA_SOURCE_PREFIX)
        .unwrap_or(connection_string)
        .trim();

    if path == ":memory:" {
        open_in_memory()
    } else {
        open(path)
    }
}

/// Apply connection PRAGMAs from the store config
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(from_rusqlite)?;

    // journal_mode answers with the mode actually in effect (in-memory
    // databases stay "memory"), so read the row back
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
            row.get(0)
        })
        .map_err(from_rusqlite)?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(from_rusqlite)?;

    Ok(())
}
