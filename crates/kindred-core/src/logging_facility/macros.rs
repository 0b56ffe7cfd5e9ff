//! Operation logging macros
//!
//! A persistence operation logs one `start` event and then exactly one of
//! `end` or `end_error`. All three carry `component` (the calling module),
//! `op` and `event`; callers add `table`, `parent_id` and row counts.
//!
//! The macros resolve `tracing` and the event names through this crate, so
//! callers need neither as a direct dependency.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $event:ident, $op:expr $(, $($field:tt)*)?) => {
        $crate::__private::tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::__private::schema::$event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use kindred_core::log_op_start;
/// log_op_start!("child_load");
/// log_op_start!("child_sync", table = "orders_lines", parent_id = 7);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(info, EVENT_START, $op $(, $($field)*)?)
    };
}

/// Log the successful end of an operation; `duration_ms` is required
///
/// ```
/// # use kindred_core::log_op_end;
/// log_op_end!("child_sync", duration_ms = 3, table = "orders_lines", inserted = 2u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(info, EVENT_END, $op, duration_ms = $duration $(, $($field)*)?)
    };
}

/// Log a failed operation
///
/// `$err` is anything convertible into `ExError`. Its kind, code, child
/// table and sync phase are logged as `err_kind`, `err.code`, `err.table`
/// and `err.phase`.
///
/// ```
/// # use kindred_core::log_op_error;
/// # use kindred_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::SyncFailure)
///     .with_table("orders_lines")
///     .with_phase("delete");
/// log_op_error!("child_sync", err, duration_ms = 1, table = "orders_lines");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.table = ex_err.table().unwrap_or(""),
            err.phase = ex_err.phase().unwrap_or("")
            $(, $($field)*)?
        )
    }};
}
