use thiserror::Error;

/// Result type alias using KindredError
pub type Result<T> = std::result::Result<T, KindredError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by kindred maps to one of these kinds, and each
/// kind maps to a stable code usable for programmatic handling and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidSchema,
    NotFound,

    // Child-table persistence
    /// Adding a missing column to a child table failed
    SchemaMigrationFailure,
    /// An insert/update/delete batch against a child table failed
    SyncFailure,
    /// Reading child rows during a parent load failed
    LoadFailure,

    // Integration/IO
    Persistence,
    Serialization,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidSchema => "ERR_INVALID_SCHEMA",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::SchemaMigrationFailure => "ERR_SCHEMA_MIGRATION",
            ExErrorKind::SyncFailure => "ERR_SYNC_FAILURE",
            ExErrorKind::LoadFailure => "ERR_LOAD_FAILURE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the child
/// table and sync phase a storage failure happened in.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<String>,
    phase: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            phase: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add child table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add sync phase context (`schema`, `insert`, `update`, `delete`, `load`)
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Add record ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the child table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the sync phase context, if any
    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    /// Get the record ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if let Some(table) = &self.table {
            write!(f, " on table '{}'", table)?;
        }
        if let Some(phase) = &self.phase {
            write!(f, " during {} phase", phase)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for in-memory child-record operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KindredError {
    /// Update targeted an id that is not in the live collection
    #[error("Record not found in collection: {id}")]
    RecordNotFound { id: String },

    /// Update was called with an empty id
    #[error("Record has no id")]
    MissingRecordId,

    /// Schema field list failed validation
    #[error("Invalid schema for {record}: {reason}")]
    InvalidSchema { record: String, reason: String },

    /// A stored value could not be converted into the field's Rust type
    #[error("Cannot convert {found} into {expected} for field {field}")]
    FieldConversion {
        field: String,
        expected: String,
        found: String,
    },

    /// The record type has no field with this name
    #[error("Unknown field: {field}")]
    UnknownField { field: String },
}

impl From<KindredError> for ExError {
    fn from(err: KindredError) -> Self {
        match err {
            KindredError::RecordNotFound { id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(id)
                .with_op("update")
                .with_message("Record not found in collection"),

            KindredError::MissingRecordId => ExError::new(ExErrorKind::InvalidInput)
                .with_op("update")
                .with_message("Record has no id"),

            KindredError::InvalidSchema { record, reason } => {
                ExError::new(ExErrorKind::InvalidSchema)
                    .with_entity_id(record)
                    .with_message(reason)
            }

            KindredError::FieldConversion {
                field,
                expected,
                found,
            } => ExError::new(ExErrorKind::Serialization).with_message(format!(
                "Cannot convert {} into {} for field {}",
                found, expected, field
            )),

            KindredError::UnknownField { field } => ExError::new(ExErrorKind::InvalidInput)
                .with_message(format!("Unknown field: {}", field)),
        }
    }
}
