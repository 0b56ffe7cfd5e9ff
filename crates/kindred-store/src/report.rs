//! Outcome reports for child-table writes and loads

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Rows and statements produced by one child-table write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub columns_added: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// PRAGMA/CREATE/ALTER statements issued
    pub schema_statements: usize,
    pub insert_statements: usize,
    pub update_statements: usize,
    pub delete_statements: usize,
    /// Existence probes (slot upsert COUNT queries)
    pub probe_statements: usize,
}

impl SyncReport {
    /// Total SQL statements issued
    pub fn statements(&self) -> usize {
        self.schema_statements
            + self.insert_statements
            + self.update_statements
            + self.delete_statements
            + self.probe_statements
    }

    pub fn is_noop(&self) -> bool {
        self.statements() == 0
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.columns_added += other.columns_added;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.schema_statements += other.schema_statements;
        self.insert_statements += other.insert_statements;
        self.update_statements += other.update_statements;
        self.delete_statements += other.delete_statements;
        self.probe_statements += other.probe_statements;
    }
}

/// Per-table write reports for one parent insert/update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChildWriteReport {
    pub tables: BTreeMap<String, SyncReport>,
}

impl ChildWriteReport {
    pub fn record(&mut self, table: &str, report: &SyncReport) {
        self.tables.entry(table.to_string()).or_default().merge(report);
    }

    pub fn table(&self, table: &str) -> Option<&SyncReport> {
        self.tables.get(table)
    }

    pub fn total(&self) -> SyncReport {
        let mut total = SyncReport::default();
        for report in self.tables.values() {
            total.merge(report);
        }
        total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The table has no column for this field
    MissingColumn,
    /// The stored value did not convert into the field type
    Conversion(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingColumn => f.write_str("missing column"),
            SkipReason::Conversion(detail) => write!(f, "conversion failed: {}", detail),
        }
    }
}

/// A field left at its default during load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    pub table: String,
    pub field: String,
    pub reason: SkipReason,
}

/// Rows materialized by a load, plus every field that was skipped
///
/// SQL NULLs are not skips; the field just keeps its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows: usize,
    pub skipped: Vec<SkippedField>,
}

impl LoadReport {
    pub fn skip(&mut self, table: &str, field: &str, reason: SkipReason) {
        self.skipped.push(SkippedField {
            table: table.to_string(),
            field: field.to_string(),
            reason,
        });
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.rows += other.rows;
        self.skipped.extend(other.skipped);
    }

    /// True if no field was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
