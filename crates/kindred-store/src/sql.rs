//! SQL text builders for child tables
//!
//! Pure string construction, no I/O. Column order always follows the
//! record's `SchemaDescriptor`, so the placeholders produced here line up
//! with `Record::values()` positionally.

use kindred_core::schema::{FieldDef, SchemaDescriptor};

/// Leading (non-schema) columns of a child table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// `Id TEXT PRIMARY KEY, ParentId, CreatedAt, UpdatedAt`
    Tracked,
    /// `Id INTEGER PRIMARY KEY AUTOINCREMENT, ParentId`
    Surrogate,
}

impl TableLayout {
    /// Column definitions for `CREATE TABLE`
    pub fn key_definitions(&self) -> &'static [&'static str] {
        match self {
            TableLayout::Tracked => &[
                "Id TEXT PRIMARY KEY",
                "ParentId INTEGER",
                "CreatedAt INTEGER",
                "UpdatedAt INTEGER",
            ],
            TableLayout::Surrogate => &["Id INTEGER PRIMARY KEY AUTOINCREMENT", "ParentId INTEGER"],
        }
    }

    /// Leading columns written by an INSERT, before the schema fields
    pub fn insert_columns(&self) -> &'static [&'static str] {
        match self {
            TableLayout::Tracked => &["Id", "ParentId", "CreatedAt", "UpdatedAt"],
            TableLayout::Surrogate => &["ParentId"],
        }
    }

    /// Bind parameters one row consumes in an INSERT
    pub fn params_per_row(&self, schema: &SchemaDescriptor) -> usize {
        self.insert_columns().len() + schema.len()
    }
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(leading: &[&'static str], schema: &SchemaDescriptor) -> String {
    leading
        .iter()
        .copied()
        .chain(schema.names())
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub fn table_info_sql(table: &str) -> String {
    format!("PRAGMA table_info({})", quote_ident(table))
}

pub fn create_table_sql(table: &str, layout: TableLayout, schema: &SchemaDescriptor) -> String {
    let columns: Vec<String> = layout
        .key_definitions()
        .iter()
        .map(|def| def.to_string())
        .chain(
            schema
                .fields()
                .iter()
                .map(|f| format!("{} {}", quote_ident(f.name), f.ty.sql_type())),
        )
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

pub fn add_column_sql(table: &str, field: &FieldDef) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table),
        quote_ident(field.name),
        field.ty.sql_type()
    )
}

/// Multi-row INSERT with `rows` value tuples
pub fn insert_sql(
    table: &str,
    layout: TableLayout,
    schema: &SchemaDescriptor,
    rows: usize,
) -> String {
    let tuple = format!("({})", placeholders(layout.params_per_row(schema)));
    let values = vec![tuple.as_str(); rows.max(1)].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        column_list(layout.insert_columns(), schema),
        values
    )
}

/// Tracked-row UPDATE keyed by `Id`
///
/// `CreatedAt` is written once, on insert, and never updated.
/// Parameters: `UpdatedAt, <fields...>, Id`.
pub fn update_by_id_sql(table: &str, schema: &SchemaDescriptor) -> String {
    let assignments: Vec<String> = std::iter::once("UpdatedAt")
        .chain(schema.names())
        .map(|name| format!("{} = ?", quote_ident(name)))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE \"Id\" = ?",
        quote_ident(table),
        assignments.join(", ")
    )
}

/// Slot UPDATE keyed by `ParentId`; `None` when there is nothing to set
///
/// Parameters: `<fields...>, ParentId`.
pub fn update_by_parent_sql(table: &str, schema: &SchemaDescriptor) -> Option<String> {
    if schema.is_empty() {
        return None;
    }

    let assignments: Vec<String> = schema
        .names()
        .map(|name| format!("{} = ?", quote_ident(name)))
        .collect();

    Some(format!(
        "UPDATE {} SET {} WHERE \"ParentId\" = ?",
        quote_ident(table),
        assignments.join(", ")
    ))
}

pub fn delete_in_sql(table: &str, ids: usize) -> String {
    format!(
        "DELETE FROM {} WHERE \"Id\" IN ({})",
        quote_ident(table),
        placeholders(ids.max(1))
    )
}

pub fn count_by_parent_sql(table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE \"ParentId\" = ?",
        quote_ident(table)
    )
}

pub fn select_by_parent_sql(table: &str, limit: Option<usize>) -> String {
    let mut sql = format!(
        "SELECT * FROM {} WHERE \"ParentId\" = ? ORDER BY \"Id\"",
        quote_ident(table)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}
