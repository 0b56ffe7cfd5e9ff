//! Persistence for the three child relationship kinds
//!
//! - [`tracked`]: change-tracked collections, batched sync
//! - [`eager`]: write-once lists
//! - [`slot`]: one upsertable record per parent

pub mod eager;
pub mod slot;
pub mod tracked;

use kindred_core::model::ChildRecord;
use rusqlite::Row;

use crate::report::LoadReport;
use crate::value::{key_i64, FieldColumns};

/// Build a surrogate-keyed record from a row
pub(crate) fn child_from_row<C: ChildRecord>(
    row: &Row<'_>,
    fields: &FieldColumns,
    table: &str,
    report: &mut LoadReport,
) -> C {
    let mut record = C::default();
    record.set_id(key_i64(row, "Id"));
    record.set_parent_id(key_i64(row, "ParentId"));
    fields.apply(row, &mut record, table, report);
    report.rows += 1;
    record
}
