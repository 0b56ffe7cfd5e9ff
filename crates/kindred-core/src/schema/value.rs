//! Semantic field types and storage values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{KindredError, Result};

/// Semantic type of a persisted scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Boolean,
    Float,
    /// Stored as INTEGER epoch-milliseconds
    Timestamp,
    Binary,
    Text,
}

impl SemanticType {
    /// SQLite column type used when creating or migrating a column
    pub fn sql_type(&self) -> &'static str {
        match self {
            SemanticType::Integer | SemanticType::Boolean | SemanticType::Timestamp => "INTEGER",
            SemanticType::Float => "REAL",
            SemanticType::Binary => "BLOB",
            SemanticType::Text => "TEXT",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Boolean => "boolean",
            SemanticType::Float => "float",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Binary => "binary",
            SemanticType::Text => "text",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single storage value, matching SQLite's storage classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Storage class name, used in conversion error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

/// Maps a Rust field type to a semantic type and to/from storage values
///
/// Implemented for the scalar types a child record may persist. `Option<T>`
/// maps `None` to SQL NULL.
pub trait FieldType: Sized {
    const SEMANTIC: SemanticType;

    fn to_value(&self) -> Value;

    /// Convert a non-null storage value back into the field type
    ///
    /// # Errors
    ///
    /// Returns `FieldConversion` when the storage class does not fit.
    fn from_value(field: &str, value: Value) -> Result<Self>;
}

fn mismatch<T>(field: &str, expected: SemanticType, found: &Value) -> Result<T> {
    Err(KindredError::FieldConversion {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    })
}

impl FieldType for i64 {
    const SEMANTIC: SemanticType = SemanticType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for i32 {
    const SEMANTIC: SemanticType = SemanticType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => i32::try_from(v).map_err(|_| {
                KindredError::FieldConversion {
                    field: field.to_string(),
                    expected: "i32".to_string(),
                    found: format!("out-of-range integer {}", v),
                }
            }),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for u32 {
    const SEMANTIC: SemanticType = SemanticType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => u32::try_from(v).map_err(|_| {
                KindredError::FieldConversion {
                    field: field.to_string(),
                    expected: "u32".to_string(),
                    found: format!("out-of-range integer {}", v),
                }
            }),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for bool {
    const SEMANTIC: SemanticType = SemanticType::Boolean;

    fn to_value(&self) -> Value {
        Value::Integer(if *self { 1 } else { 0 })
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v != 0),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for f64 {
    const SEMANTIC: SemanticType = SemanticType::Float;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Real(v) => Ok(v),
            // SQLite stores integral REAL values it can as INTEGER
            Value::Integer(v) => Ok(v as f64),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for f32 {
    const SEMANTIC: SemanticType = SemanticType::Float;

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        f64::from_value(field, value).map(|v| v as f32)
    }
}

impl FieldType for String {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for Vec<u8> {
    const SEMANTIC: SemanticType = SemanticType::Binary;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl FieldType for DateTime<Utc> {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Integer(self.timestamp_millis())
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                KindredError::FieldConversion {
                    field: field.to_string(),
                    expected: Self::SEMANTIC.to_string(),
                    found: format!("out-of-range epoch-ms {}", ms),
                }
            }),
            other => mismatch(field, Self::SEMANTIC, &other),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const SEMANTIC: SemanticType = T::SEMANTIC;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(field, other).map(Some),
        }
    }
}
