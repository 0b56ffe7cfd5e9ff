//! Column-set inspection and additive column migration

use kindred_core::schema::{FieldDef, SchemaDescriptor};
use kindred_core_types::schema::OP_MIGRATE_COLUMNS;
use rusqlite::Connection;

use crate::errors::{schema_migration_failure, Result};
use crate::sql::{self, TableLayout};

/// What [`ensure_table`] had to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub created: bool,
    pub columns_added: usize,
    /// PRAGMA + CREATE + ALTER statements issued
    pub statements: usize,
}

/// Current column names of `table`, empty if the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&sql::table_info_sql(table))
        .map_err(|e| schema_migration_failure(table, e))?;

    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| schema_migration_failure(table, e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| schema_migration_failure(table, e))?;

    Ok(columns)
}

/// Schema fields with no same-named column, compared case-insensitively
pub fn missing_fields<'a>(existing: &[String], schema: &'a SchemaDescriptor) -> Vec<&'a FieldDef> {
    schema
        .fields()
        .iter()
        .filter(|f| !existing.iter().any(|c| c.eq_ignore_ascii_case(f.name)))
        .collect()
}

/// Create `table` if absent, otherwise add every missing schema column
///
/// # Errors
///
/// Returns `SchemaMigrationFailure` naming the table if the column
/// lookup, the CREATE, or any ALTER fails.
pub fn ensure_table(
    conn: &Connection,
    table: &str,
    layout: TableLayout,
    schema: &SchemaDescriptor,
) -> Result<MigrationOutcome> {
    let mut outcome = MigrationOutcome::default();

    let existing = table_columns(conn, table)?;
    outcome.statements += 1;

    if existing.is_empty() {
        conn.execute(&sql::create_table_sql(table, layout, schema), [])
            .map_err(|e| schema_migration_failure(table, e))?;
        outcome.statements += 1;
        outcome.created = true;

        tracing::debug!(
            component = module_path!(),
            op = OP_MIGRATE_COLUMNS,
            table = table,
            columns = schema.len() as u64,
            "child table created"
        );
        return Ok(outcome);
    }

    for field in missing_fields(&existing, schema) {
        conn.execute(&sql::add_column_sql(table, field), [])
            .map_err(|e| schema_migration_failure(table, e))?;
        outcome.statements += 1;
        outcome.columns_added += 1;

        tracing::info!(
            component = module_path!(),
            op = OP_MIGRATE_COLUMNS,
            table = table,
            column = field.name,
            sql_type = field.ty.sql_type(),
            "child table column added"
        );
    }

    Ok(outcome)
}
