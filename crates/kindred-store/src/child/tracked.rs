//! Sync and load for tracked child collections
//!
//! A sync runs inside the caller's transaction in four phases: schema,
//! insert, update, delete. Each write phase acknowledges (clears) its own
//! dirty set as soon as its statements succeed. A failure in a later phase
//! therefore leaves earlier phases acknowledged even though the caller's
//! transaction will roll their rows back; the caller must discard or
//! reload the collection after a failed sync.

use std::time::Instant;

use kindred_core::collection::TrackedCollection;
use kindred_core::model::TrackedRecord;
use kindred_core::schema::Value;
use kindred_core::{log_op_end, log_op_error, log_op_start};
use kindred_core_types::schema::{
    OP_CHILD_LOAD, OP_CHILD_SYNC, PHASE_DELETE, PHASE_INSERT, PHASE_UPDATE,
};
use rusqlite::{params_from_iter, Connection, Transaction};

use crate::config::StoreConfig;
use crate::db;
use crate::errors::{from_rusqlite, load_failure, sync_failure, Result};
use crate::migrations::{ensure_table, table_columns};
use crate::report::{LoadReport, SyncReport};
use crate::sql::{self, TableLayout};
use crate::value::{key_i64, to_sql, FieldColumns};

/// Flush the collection's pending changes to its bound child table
///
/// An unbound collection, or one with nothing pending, issues no SQL and
/// returns an empty report.
///
/// # Errors
///
/// Returns `SchemaMigrationFailure` if the column check or a column add
/// fails, and `SyncFailure` (with the phase) if a write statement fails.
/// Remaining phases are skipped.
pub fn sync<T: TrackedRecord>(
    tx: &Transaction,
    collection: &mut TrackedCollection<T>,
    config: &StoreConfig,
) -> Result<SyncReport> {
    let Some(binding) = collection.binding().cloned() else {
        tracing::debug!(
            component = module_path!(),
            op = OP_CHILD_SYNC,
            "collection not bound, nothing to sync"
        );
        return Ok(SyncReport::default());
    };

    if !collection.is_dirty() {
        return Ok(SyncReport::default());
    }

    let table = binding.table_name.as_str();
    log_op_start!(OP_CHILD_SYNC, table = table, parent_id = binding.parent_id);
    let start = Instant::now();

    let report = sync_impl(tx, collection, table, binding.parent_id, config).map_err(|e| {
        log_op_error!(
            OP_CHILD_SYNC,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    log_op_end!(
        OP_CHILD_SYNC,
        duration_ms = start.elapsed().as_millis() as u64,
        table = table,
        inserted = report.inserted as u64,
        updated = report.updated as u64,
        deleted = report.deleted as u64,
        columns_added = report.columns_added as u64,
        statements = report.statements() as u64
    );

    Ok(report)
}

fn sync_impl<T: TrackedRecord>(
    tx: &Transaction,
    collection: &mut TrackedCollection<T>,
    table: &str,
    parent_id: i64,
    config: &StoreConfig,
) -> Result<SyncReport> {
    let schema = T::schema();
    let mut report = SyncReport::default();

    let migration = ensure_table(tx, table, TableLayout::Tracked, schema)?;
    report.schema_statements = migration.statements;
    report.columns_added = migration.columns_added;

    // Insert
    {
        let pending = collection.pending_inserts();
        if !pending.is_empty() {
            let per_row = TableLayout::Tracked.params_per_row(schema);
            let rows_per_statement = (config.max_bind_params / per_row).max(1);

            for chunk in pending.chunks(rows_per_statement) {
                let mut params = Vec::with_capacity(chunk.len() * per_row);
                for record in chunk {
                    params.push(Value::Text(record.id().to_string()));
                    params.push(Value::Integer(parent_id));
                    params.push(Value::Integer(record.created_at()));
                    params.push(Value::Integer(record.updated_at()));
                    params.extend(record.values());
                }

                let inserted = tx
                    .execute(
                        &sql::insert_sql(table, TableLayout::Tracked, schema, chunk.len()),
                        params_from_iter(params.into_iter().map(to_sql)),
                    )
                    .map_err(|e| sync_failure(table, PHASE_INSERT, e))?;
                report.inserted += inserted;
                report.insert_statements += 1;
            }
        }
    }
    collection.acknowledge_inserts();

    // Update
    {
        let pending = collection.pending_updates();
        if !pending.is_empty() {
            let mut stmt = tx
                .prepare(&sql::update_by_id_sql(table, schema))
                .map_err(|e| sync_failure(table, PHASE_UPDATE, e))?;

            for record in pending {
                let mut params = Vec::with_capacity(schema.len() + 2);
                params.push(Value::Integer(record.updated_at()));
                params.extend(record.values());
                params.push(Value::Text(record.id().to_string()));

                let updated = stmt
                    .execute(params_from_iter(params.into_iter().map(to_sql)))
                    .map_err(|e| sync_failure(table, PHASE_UPDATE, e))?;
                report.updated += updated;
                report.update_statements += 1;
            }
        }
    }
    collection.acknowledge_updates();

    // Delete
    let ids: Vec<String> = collection.deleted_ids().map(str::to_string).collect();
    for chunk in ids.chunks(config.delete_chunk_size.max(1)) {
        let deleted = tx
            .execute(
                &sql::delete_in_sql(table, chunk.len()),
                params_from_iter(chunk.iter()),
            )
            .map_err(|e| sync_failure(table, PHASE_DELETE, e))?;
        report.deleted += deleted;
        report.delete_statements += 1;
    }
    collection.acknowledge_deletes();

    Ok(report)
}

/// Open the collection's bound database, sync in a fresh transaction and
/// commit
///
/// For collections used outside a parent write. Unbound or clean
/// collections return an empty report without opening anything.
///
/// # Errors
///
/// Same as [`sync`], plus `Persistence` if the database cannot be opened
/// or the commit fails.
pub fn save<T: TrackedRecord>(
    collection: &mut TrackedCollection<T>,
    config: &StoreConfig,
) -> Result<SyncReport> {
    let Some(binding) = collection.binding() else {
        return Ok(SyncReport::default());
    };
    if !collection.is_dirty() {
        return Ok(SyncReport::default());
    }

    let mut conn = db::open_connection_string(&binding.connection_string)?;
    db::configure(&conn, config)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let report = sync(&tx, collection, config)?;
    tx.commit().map_err(from_rusqlite)?;

    Ok(report)
}

/// Populate the collection from its bound child table
///
/// Loaded records start clean. A missing table loads nothing.
///
/// # Errors
///
/// Returns `LoadFailure` if the query itself fails. Per-field problems are
/// reported in the `LoadReport`, never returned as errors.
pub fn load<T: TrackedRecord>(
    conn: &Connection,
    collection: &mut TrackedCollection<T>,
) -> Result<LoadReport> {
    let Some(binding) = collection.binding().cloned() else {
        return Ok(LoadReport::default());
    };
    let table = binding.table_name.as_str();

    log_op_start!(OP_CHILD_LOAD, table = table, parent_id = binding.parent_id);
    let start = Instant::now();

    let (records, report) = load_impl::<T>(conn, table, binding.parent_id).map_err(|e| {
        log_op_error!(
            OP_CHILD_LOAD,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            table = table
        );
        e
    })?;

    for record in records {
        collection.load_from_database(record);
    }

    log_op_end!(
        OP_CHILD_LOAD,
        duration_ms = start.elapsed().as_millis() as u64,
        table = table,
        rows = report.rows as u64,
        skipped = report.skipped.len() as u64
    );

    Ok(report)
}

fn load_impl<T: TrackedRecord>(
    conn: &Connection,
    table: &str,
    parent_id: i64,
) -> Result<(Vec<T>, LoadReport)> {
    let mut report = LoadReport::default();
    if table_columns(conn, table)?.is_empty() {
        return Ok((Vec::new(), report));
    }

    let mut stmt = conn
        .prepare(&sql::select_by_parent_sql(table, None))
        .map_err(|e| load_failure(table, e))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let fields = FieldColumns::resolve::<T>(&column_names);

    let mut rows = stmt.query([parent_id]).map_err(|e| load_failure(table, e))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|e| load_failure(table, e))? {
        let Ok(Some(id)) = row.get::<_, Option<String>>("Id") else {
            continue;
        };

        let mut record = T::default();
        record.set_id(id);
        record.set_parent_id(key_i64(row, "ParentId"));
        record.set_created_at(key_i64(row, "CreatedAt"));
        record.set_updated_at(key_i64(row, "UpdatedAt"));
        fields.apply(row, &mut record, table, &mut report);

        records.push(record);
        report.rows += 1;
    }
    fields.report_missing(table, &mut report);

    Ok((records, report))
}
