//! Single child slot: zero or one nested record per parent

use std::time::Instant;

use kindred_core::model::ChildRecord;
use kindred_core::schema::Value;
use kindred_core::{log_op_end, log_op_error, log_op_start};
use kindred_core_types::schema::{OP_CHILD_LOAD, OP_CHILD_UPSERT, PHASE_INSERT, PHASE_UPDATE};
use rusqlite::{params_from_iter, Connection, Transaction};

use crate::errors::{load_failure, sync_failure, Result};
use crate::migrations::table_columns;
use crate::report::{LoadReport, SyncReport};
use crate::sql::{self, TableLayout};
use crate::value::{to_sql, FieldColumns};

use super::child_from_row;

/// Unconditional INSERT, used on parent insert
///
/// # Errors
///
/// Returns `SyncFailure` in the insert phase.
pub fn insert<C: ChildRecord>(
    tx: &Transaction,
    table: &str,
    parent_id: i64,
    record: &mut C,
) -> Result<SyncReport> {
    record.set_parent_id(parent_id);

    let mut params = Vec::with_capacity(C::schema().len() + 1);
    params.push(Value::Integer(parent_id));
    params.extend(record.values());

    let inserted = tx
        .execute(
            &sql::insert_sql(table, TableLayout::Surrogate, C::schema(), 1),
            params_from_iter(params.into_iter().map(to_sql)),
        )
        .map_err(|e| sync_failure(table, PHASE_INSERT, e))?;
    record.set_id(tx.last_insert_rowid());

    Ok(SyncReport {
        inserted,
        insert_statements: 1,
        ..Default::default()
    })
}

/// UPDATE the parent's row if one exists, otherwise INSERT it
///
/// # Errors
///
/// Returns `SyncFailure` with the phase of the failing statement.
pub fn upsert<C: ChildRecord>(
    tx: &Transaction,
    table: &str,
    parent_id: i64,
    record: &mut C,
) -> Result<SyncReport> {
    log_op_start!(OP_CHILD_UPSERT, table = table, parent_id = parent_id);
    let start = Instant::now();

    let report = upsert_impl(tx, table, parent_id, record).map_err(|e| {
        log_op_error!(
            OP_CHILD_UPSERT,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    log_op_end!(
        OP_CHILD_UPSERT,
        duration_ms = start.elapsed().as_millis() as u64,
        table = table,
        inserted = report.inserted as u64,
        updated = report.updated as u64
    );

    Ok(report)
}

fn upsert_impl<C: ChildRecord>(
    tx: &Transaction,
    table: &str,
    parent_id: i64,
    record: &mut C,
) -> Result<SyncReport> {
    let existing: i64 = tx
        .query_row(&sql::count_by_parent_sql(table), [parent_id], |row| {
            row.get(0)
        })
        .map_err(|e| sync_failure(table, PHASE_UPDATE, e))?;

    if existing == 0 {
        let mut report = insert(tx, table, parent_id, record)?;
        report.probe_statements = 1;
        return Ok(report);
    }

    record.set_parent_id(parent_id);
    let mut report = SyncReport {
        probe_statements: 1,
        ..Default::default()
    };

    // A record with no schema fields has nothing to write
    if let Some(update) = sql::update_by_parent_sql(table, C::schema()) {
        let mut params = record.values();
        params.push(Value::Integer(parent_id));

        report.updated = tx
            .execute(&update, params_from_iter(params.into_iter().map(to_sql)))
            .map_err(|e| sync_failure(table, PHASE_UPDATE, e))?;
        report.update_statements = 1;
    }

    Ok(report)
}

/// Read the parent's row, if any
///
/// # Errors
///
/// Returns `LoadFailure` if the query fails.
pub fn load<C: ChildRecord>(
    conn: &Connection,
    table: &str,
    parent_id: i64,
) -> Result<(Option<C>, LoadReport)> {
    log_op_start!(OP_CHILD_LOAD, table = table, parent_id = parent_id);
    let start = Instant::now();

    let (record, report) = load_impl::<C>(conn, table, parent_id).map_err(|e| {
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

    Ok((record, report))
}

fn load_impl<C: ChildRecord>(
    conn: &Connection,
    table: &str,
    parent_id: i64,
) -> Result<(Option<C>, LoadReport)> {
    let mut report = LoadReport::default();
    if table_columns(conn, table)?.is_empty() {
        return Ok((None, report));
    }

    let mut stmt = conn
        .prepare(&sql::select_by_parent_sql(table, Some(1)))
        .map_err(|e| load_failure(table, e))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let fields = FieldColumns::resolve::<C>(&column_names);

    let mut rows = stmt.query([parent_id]).map_err(|e| load_failure(table, e))?;
    let record = match rows.next().map_err(|e| load_failure(table, e))? {
        Some(row) => Some(child_from_row::<C>(row, &fields, table, &mut report)),
        None => None,
    };
    fields.report_missing(table, &mut report);

    Ok((record, report))
}
