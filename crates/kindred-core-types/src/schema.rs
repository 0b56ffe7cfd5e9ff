//! Canonical schema constants for structured logging and events
//!
//! These constants keep the field keys emitted by the store and the
//! keys asserted on by tests in one place.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Child-table identifiers
pub const FIELD_TABLE: &str = "table";
pub const FIELD_PARENT_ID: &str = "parent_id";
pub const FIELD_PHASE: &str = "phase";

// Row and statement counts
pub const FIELD_INSERTED: &str = "inserted";
pub const FIELD_UPDATED: &str = "updated";
pub const FIELD_DELETED: &str = "deleted";
pub const FIELD_STATEMENTS: &str = "statements";
pub const FIELD_COLUMNS_ADDED: &str = "columns_added";
pub const FIELD_ROWS: &str = "rows";
pub const FIELD_SKIPPED: &str = "skipped";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Operation names
pub const OP_CHILD_SYNC: &str = "child_sync";
pub const OP_CHILD_LOAD: &str = "child_load";
pub const OP_CHILD_INSERT: &str = "child_insert";
pub const OP_CHILD_UPSERT: &str = "child_upsert";
pub const OP_CREATE_CHILD_TABLES: &str = "create_child_tables";
pub const OP_MIGRATE_COLUMNS: &str = "migrate_columns";

// Sync phases, in execution order
pub const PHASE_SCHEMA: &str = "schema";
pub const PHASE_INSERT: &str = "insert";
pub const PHASE_UPDATE: &str = "update";
pub const PHASE_DELETE: &str = "delete";
pub const PHASE_LOAD: &str = "load";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_TABLE.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_phase_names_are_distinct() {
        let phases = [PHASE_SCHEMA, PHASE_INSERT, PHASE_UPDATE, PHASE_DELETE, PHASE_LOAD];
        for (i, a) in phases.iter().enumerate() {
            for b in &phases[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
