//! Per-record-type schema descriptor

use std::collections::HashSet;

use super::value::SemanticType;
use crate::errors::{KindredError, Result};

/// Column names owned by the child-table layout, never by a record field.
///
/// Matched case-insensitively, as SQLite column names are.
pub const RESERVED_COLUMNS: [&str; 4] = ["Id", "ParentId", "CreatedAt", "UpdatedAt"];

/// A persisted scalar field: column name plus semantic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: SemanticType,
}

impl FieldDef {
    pub const fn new(name: &'static str, ty: SemanticType) -> Self {
        Self { name, ty }
    }
}

/// Ordered list of a record type's persisted scalar fields
///
/// Fields are sorted lexicographically by name on construction. That order
/// is the column order in `CREATE TABLE` and the positional binding order
/// in every generated `INSERT`/`UPDATE`, so it must never depend on
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    record: &'static str,
    fields: Vec<FieldDef>,
}

impl SchemaDescriptor {
    /// Build a descriptor for `record` from its field list
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a name is empty, duplicated, or collides
    /// with one of [`RESERVED_COLUMNS`].
    pub fn new(record: &'static str, mut fields: Vec<FieldDef>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(KindredError::InvalidSchema {
                    record: record.to_string(),
                    reason: "field name is empty".to_string(),
                });
            }
            if RESERVED_COLUMNS
                .iter()
                .any(|r| r.eq_ignore_ascii_case(field.name))
            {
                return Err(KindredError::InvalidSchema {
                    record: record.to_string(),
                    reason: format!("field name '{}' is a reserved column", field.name),
                });
            }
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(KindredError::InvalidSchema {
                    record: record.to_string(),
                    reason: format!("duplicate field '{}'", field.name),
                });
            }
        }

        fields.sort_by(|a, b| a.name.cmp(b.name));

        Ok(Self { record, fields })
    }

    /// Name of the record type this descriptor belongs to
    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_sorted_lexicographically() {
        let schema = SchemaDescriptor::new(
            "Line",
            vec![
                FieldDef::new("sku", SemanticType::Text),
                FieldDef::new("amount", SemanticType::Float),
                FieldDef::new("qty", SemanticType::Integer),
            ],
        )
        .unwrap();

        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, vec!["amount", "qty", "sku"]);
    }

    #[test]
    fn test_order_independent_of_declaration() {
        let a = SchemaDescriptor::new(
            "A",
            vec![
                FieldDef::new("b", SemanticType::Text),
                FieldDef::new("a", SemanticType::Text),
            ],
        )
        .unwrap();
        let b = SchemaDescriptor::new(
            "A",
            vec![
                FieldDef::new("a", SemanticType::Text),
                FieldDef::new("b", SemanticType::Text),
            ],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reserved_names_rejected_case_insensitively() {
        for name in ["Id", "id", "parentid", "CREATEDAT", "UpdatedAt"] {
            let leaked: &'static str = Box::leak(name.to_string().into_boxed_str());
            let result =
                SchemaDescriptor::new("R", vec![FieldDef::new(leaked, SemanticType::Integer)]);
            assert!(
                matches!(result, Err(KindredError::InvalidSchema { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = SchemaDescriptor::new(
            "R",
            vec![
                FieldDef::new("name", SemanticType::Text),
                FieldDef::new("Name", SemanticType::Text),
            ],
        );
        assert!(matches!(result, Err(KindredError::InvalidSchema { .. })));
    }

    #[test]
    fn test_lookup_by_name() {
        let schema =
            SchemaDescriptor::new("R", vec![FieldDef::new("qty", SemanticType::Integer)]).unwrap();
        assert_eq!(schema.field("qty").map(|f| f.ty), Some(SemanticType::Integer));
        assert!(schema.field("missing").is_none());
    }
}
