//! Kindred Store - SQLite persistence for parent-owned child records
//!
//! Provides:
//! - Connection setup and store configuration
//! - SQL builders and additive column migration for child tables
//! - Batched sync and load for tracked collections
//! - Insert/load for write-once lists and upsert/load for single slots
//! - A relationship dispatcher that drives all three from a parent type

pub mod child;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod errors;
pub mod migrations;
pub mod report;
pub mod sql;
mod value;

// Re-export key types
pub use config::{JournalMode, StoreConfig};
pub use dispatcher::{
    child_table_name, ParentEntity, Relation, RelationKind, RelationshipDispatcher,
};
pub use errors::Result;
pub use report::{ChildWriteReport, LoadReport, SkipReason, SkippedField, SyncReport};
