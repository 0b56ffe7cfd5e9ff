//! Store configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::errors::{config_error, Result};

/// SQLite journal mode applied by [`crate::db::configure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Wal,
    Memory,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum ids per `DELETE ... WHERE Id IN (...)` statement
    pub delete_chunk_size: usize,
    /// Bind-parameter ceiling for one statement; the insert phase splits
    /// its multi-row INSERT only when a single statement would exceed it
    pub max_bind_params: usize,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delete_chunk_size: 500,
            // SQLITE_MAX_VARIABLE_NUMBER of the bundled library
            max_bind_params: 32766,
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a JSON config
    ///
    /// # Errors
    ///
    /// Returns a `Config` error on malformed JSON or an invalid value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(json)
            .map_err(|e| config_error(format!("Invalid store config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a `Config` error if a size limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.delete_chunk_size == 0 {
            return Err(config_error("delete_chunk_size must be at least 1"));
        }
        if self.max_bind_params == 0 {
            return Err(config_error("max_bind_params must be at least 1"));
        }
        Ok(())
    }
}
