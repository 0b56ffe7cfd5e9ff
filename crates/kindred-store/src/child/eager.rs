//! Write-once child lists
//!
//! Rows are written once, with the parent, and read back on load. There is
//! no update or delete path.

use std::time::Instant;

use kindred_core::model::ChildRecord;
use kindred_core::schema::Value;
use kindred_core::{log_op_end, log_op_error, log_op_start};
use kindred_core_types::schema::{OP_CHILD_INSERT, OP_CHILD_LOAD, PHASE_INSERT};
use rusqlite::{params_from_iter, Connection, Transaction};

use crate::errors::{load_failure, sync_failure, Result};
use crate::migrations::table_columns;
use crate::report::{LoadReport, SyncReport};
use crate::sql::{self, TableLayout};
use crate::value::{to_sql, FieldColumns};

use super::child_from_row;

/// Insert every record, one statement each
///
/// Backfills `parent_id` before the write and the storage-assigned `id`
/// after it.
///
/// # Errors
///
/// Returns `SyncFailure` in the insert phase; records after the failing
/// one are not written.
pub fn insert_all<C: ChildRecord>(
    tx: &Transaction,
    table: &str,
    parent_id: i64,
    records: &mut [C],
) -> Result<SyncReport> {
    if records.is_empty() {
        return Ok(SyncReport::default());
    }

    log_op_start!(OP_CHILD_INSERT, table = table, parent_id = parent_id);
    let start = Instant::now();

    let report = insert_all_impl(tx, table, parent_id, records).map_err(|e| {
        log_op_error!(
            OP_CHILD_INSERT,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    log_op_end!(
        OP_CHILD_INSERT,
        duration_ms = start.elapsed().as_millis() as u64,
        table = table,
        inserted = report.inserted as u64
    );

    Ok(report)
}

fn insert_all_impl<C: ChildRecord>(
    tx: &Transaction,
    table: &str,
    parent_id: i64,
    records: &mut [C],
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut stmt = tx
        .prepare(&sql::insert_sql(table, TableLayout::Surrogate, C::schema(), 1))
        .map_err(|e| sync_failure(table, PHASE_INSERT, e))?;

    for record in records.iter_mut() {
        record.set_parent_id(parent_id);

        let mut params = Vec::with_capacity(C::schema().len() + 1);
        params.push(Value::Integer(parent_id));
        params.extend(record.values());

        report.inserted += stmt
            .execute(params_from_iter(params.into_iter().map(to_sql)))
            .map_err(|e| sync_failure(table, PHASE_INSERT, e))?;
        report.insert_statements += 1;

        record.set_id(tx.last_insert_rowid());
    }

    Ok(report)
}

/// Read every row belonging to `parent_id`, in insertion order
///
/// A missing table loads an empty list.
///
/// # Errors
///
/// Returns `LoadFailure` if the query fails.
pub fn load_all<C: ChildRecord>(
    conn: &Connection,
    table: &str,
    parent_id: i64,
) -> Result<(Vec<C>, LoadReport)> {
    log_op_start!(OP_CHILD_LOAD, table = table, parent_id = parent_id);
    let start = Instant::now();

    let (records, report) = load_all_impl::<C>(conn, table, parent_id).map_err(|e| {
        log_op_error!(
            OP_CHILD_LOAD,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    log_op_end!(
        OP_CHILD_LOAD,
        duration_ms = start.elapsed().as_millis() as u64,
        table = table,
        rows = report.rows as u64,
        skipped = report.skipped.len() as u64
    );

    Ok((records, report))
}

fn load_all_impl<C: ChildRecord>(
    conn: &Connection,
    table: &str,
    parent_id: i64,
) -> Result<(Vec<C>, LoadReport)> {
    let mut report = LoadReport::default();
    if table_columns(conn, table)?.is_empty() {
        return Ok((Vec::new(), report));
    }

    let mut stmt = conn
        .prepare(&sql::select_by_parent_sql(table, None))
        .map_err(|e| load_failure(table, e))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let fields = FieldColumns::resolve::<C>(&column_names);

    let mut rows = stmt.query([parent_id]).map_err(|e| load_failure(table, e))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|e| load_failure(table, e))? {
        records.push(child_from_row::<C>(row, &fields, table, &mut report));
    }
    fields.report_missing(table, &mut report);

    Ok((records, report))
}
