//! Child-table schema management
//!
//! Only additive migration exists: a missing column is added with the type
//! inferred from the field's semantic type. Columns are never dropped,
//! renamed or retyped.

mod columns;

pub use columns::{ensure_table, missing_fields, table_columns, MigrationOutcome};
