//! Schema descriptors and field values
//!
//! A record type's persisted scalar fields are described once by a
//! [`SchemaDescriptor`]. Its lexicographic field order fixes both the
//! `CREATE TABLE` column order and the positional binding order of every
//! generated statement.

pub mod descriptor;
pub mod value;

pub use descriptor::{FieldDef, SchemaDescriptor, RESERVED_COLUMNS};
pub use value::{FieldType, SemanticType, Value};
