//! Record traits for child-table rows
//!
//! Three shapes of child row exist:
//!
//! - [`Record`]: the schema fields shared by every child row
//! - [`ChildRecord`]: integer `Id` assigned by storage, plus `ParentId`
//!   (single slot and eager list rows)
//! - [`TrackedRecord`]: string `Id`, `ParentId`, and epoch-ms
//!   `CreatedAt`/`UpdatedAt` (tracked collection rows)
//!
//! Implementations are normally generated with [`record_fields!`](crate::record_fields).

use crate::errors::Result;
use crate::schema::{SchemaDescriptor, Value};

/// A record type with a cached schema and by-name field access
pub trait Record: Default {
    /// The record type's descriptor, built once and cached
    ///
    /// # Panics
    ///
    /// `record_fields!` implementations panic here if the field list is
    /// not a valid schema.
    fn schema() -> &'static SchemaDescriptor;

    /// Current value of a schema field, `None` if the name is unknown
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Assign a schema field from a storage value
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` or `FieldConversion`.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Field values in schema order, ready for positional binding
    fn values(&self) -> Vec<Value> {
        Self::schema()
            .names()
            .map(|name| self.field_value(name).unwrap_or(Value::Null))
            .collect()
    }
}

/// Row of a single-slot or eager-list child table
pub trait ChildRecord: Record {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn parent_id(&self) -> i64;
    fn set_parent_id(&mut self, parent_id: i64);
}

/// Row of a tracked child collection
pub trait TrackedRecord: Record {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn parent_id(&self) -> i64;
    fn set_parent_id(&mut self, parent_id: i64);
    /// Epoch milliseconds, 0 when unset
    fn created_at(&self) -> i64;
    fn set_created_at(&mut self, ms: i64);
    /// Epoch milliseconds, 0 when unset
    fn updated_at(&self) -> i64;
    fn set_updated_at(&mut self, ms: i64);
}

/// Implement [`Record`] (and optionally [`ChildRecord`] or [`TrackedRecord`])
/// for a struct
///
/// List only the persisted schema fields. The `child` form expects
/// `id: i64` and `parent_id: i64` fields on the struct; the `tracked` form
/// expects `id: String`, `parent_id: i64`, `created_at: i64` and
/// `updated_at: i64`.
///
/// # Panics
///
/// The descriptor is validated on the first `schema()` call, which panics
/// naming the record type if a listed field collides with a key column
/// (`Id`, `ParentId`, `CreatedAt`, `UpdatedAt`) or with another listed
/// field. Names are compared case-insensitively.
///
/// # Example
///
/// ```
/// use kindred_core::record_fields;
/// use kindred_core::model::Record;
///
/// #[derive(Debug, Default, Clone)]
/// struct Line {
///     id: String,
///     parent_id: i64,
///     created_at: i64,
///     updated_at: i64,
///     sku: String,
///     qty: i64,
/// }
///
/// record_fields!(tracked Line { sku: String, qty: i64 });
///
/// let names: Vec<_> = Line::schema().names().collect();
/// assert_eq!(names, vec!["qty", "sku"]);
/// ```
#[macro_export]
macro_rules! record_fields {
    (@record $ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::model::Record for $ty {
            fn schema() -> &'static $crate::schema::SchemaDescriptor {
                static SCHEMA: ::std::sync::OnceLock<$crate::schema::SchemaDescriptor> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    $crate::schema::SchemaDescriptor::new(
                        stringify!($ty),
                        vec![$(
                            $crate::schema::FieldDef::new(
                                stringify!($field),
                                <$fty as $crate::schema::FieldType>::SEMANTIC,
                            )
                        ),*],
                    )
                    .unwrap_or_else(|e| {
                        panic!("record_fields!({}): {}", stringify!($ty), e)
                    })
                })
            }

            fn field_value(&self, name: &str) -> Option<$crate::schema::Value> {
                match name {
                    $(stringify!($field) => Some($crate::schema::FieldType::to_value(&self.$field)),)*
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::schema::Value,
            ) -> $crate::errors::Result<()> {
                match name {
                    $(stringify!($field) => {
                        self.$field = <$fty as $crate::schema::FieldType>::from_value(name, value)?;
                        Ok(())
                    })*
                    _ => {
                        let _ = value;
                        Err($crate::errors::KindredError::UnknownField {
                            field: name.to_string(),
                        })
                    }
                }
            }
        }
    };
    (child $ty:ident { $($body:tt)* }) => {
        $crate::record_fields!(@record $ty { $($body)* });

        impl $crate::model::ChildRecord for $ty {
            fn id(&self) -> i64 {
                self.id
            }
            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
            fn parent_id(&self) -> i64 {
                self.parent_id
            }
            fn set_parent_id(&mut self, parent_id: i64) {
                self.parent_id = parent_id;
            }
        }
    };
    (tracked $ty:ident { $($body:tt)* }) => {
        $crate::record_fields!(@record $ty { $($body)* });

        impl $crate::model::TrackedRecord for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
            fn parent_id(&self) -> i64 {
                self.parent_id
            }
            fn set_parent_id(&mut self, parent_id: i64) {
                self.parent_id = parent_id;
            }
            fn created_at(&self) -> i64 {
                self.created_at
            }
            fn set_created_at(&mut self, ms: i64) {
                self.created_at = ms;
            }
            fn updated_at(&self) -> i64 {
                self.updated_at
            }
            fn set_updated_at(&mut self, ms: i64) {
                self.updated_at = ms;
            }
        }
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::record_fields!(@record $ty { $($body)* });
    };
}
