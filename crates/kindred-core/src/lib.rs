//! Kindred Core - in-memory side of child-table persistence
//!
//! This crate holds everything that does not touch SQLite:
//! - Schema descriptors and the semantic field type map
//! - Record traits and the `record_fields!` implementation macro
//! - The change-tracked child collection
//! - Error facility and structured logging facility shared with the store

pub mod collection;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod schema;

// Re-export commonly used types
pub use collection::{Binding, TrackedCollection};
pub use errors::{ExError, ExErrorKind, KindredError, Result};
pub use model::{ChildRecord, Record, TrackedRecord};
pub use schema::{FieldDef, FieldType, SchemaDescriptor, SemanticType, Value};

// Paths used by the exported logging macros
#[doc(hidden)]
pub mod __private {
    pub use kindred_core_types::schema;
    pub use tracing;
}
