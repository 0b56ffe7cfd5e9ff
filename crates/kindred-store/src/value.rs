//! Conversion between kindred values and rusqlite values, plus lenient
//! row-to-record mapping

use kindred_core::model::Record;
use kindred_core::schema::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Row;

use crate::report::{LoadReport, SkipReason};

pub(crate) fn to_sql(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(v),
        Value::Real(v) => SqlValue::Real(v),
        Value::Text(v) => SqlValue::Text(v),
        Value::Blob(v) => SqlValue::Blob(v),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> std::result::Result<Value, String> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| format!("invalid UTF-8 text: {}", e))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

/// Column index of each schema field within a result set
///
/// Resolved once per query. Fields with no matching column are reported
/// once per load (and only if a row was read), not once per row.
pub(crate) struct FieldColumns {
    slots: Vec<(&'static str, usize)>,
    missing: Vec<&'static str>,
}

impl FieldColumns {
    pub(crate) fn resolve<R: Record>(column_names: &[String]) -> Self {
        let mut slots = Vec::new();
        let mut missing = Vec::new();
        for name in R::schema().names() {
            match column_names
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
            {
                Some(idx) => slots.push((name, idx)),
                None => missing.push(name),
            }
        }
        Self { slots, missing }
    }

    pub(crate) fn report_missing(&self, table: &str, report: &mut LoadReport) {
        if report.rows == 0 {
            return;
        }
        for name in &self.missing {
            report.skip(table, name, SkipReason::MissingColumn);
        }
    }

    /// Copy every mappable column of `row` into `record`
    ///
    /// NULLs leave the field at its default; conversion failures are
    /// reported and skipped.
    pub(crate) fn apply<R: Record>(
        &self,
        row: &Row<'_>,
        record: &mut R,
        table: &str,
        report: &mut LoadReport,
    ) {
        for &(name, idx) in &self.slots {
            let value = match row.get_ref(idx) {
                Ok(raw) => from_sql(raw),
                Err(e) => Err(e.to_string()),
            };

            match value {
                Ok(Value::Null) => {}
                Ok(value) => {
                    if let Err(e) = record.set_field(name, value) {
                        report.skip(table, name, SkipReason::Conversion(e.to_string()));
                    }
                }
                Err(detail) => report.skip(table, name, SkipReason::Conversion(detail)),
            }
        }
    }
}

/// Read an integer key column, 0 when absent or not an integer
pub(crate) fn key_i64(row: &Row<'_>, column: &str) -> i64 {
    row.get::<_, Option<i64>>(column)
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_preserves_storage_class() {
        assert_eq!(to_sql(Value::Integer(3)), SqlValue::Integer(3));
        assert_eq!(to_sql(Value::Null), SqlValue::Null);
        assert_eq!(
            from_sql(ValueRef::Text(b"abc")).unwrap(),
            Value::Text("abc".to_string())
        );
        assert!(from_sql(ValueRef::Text(&[0xff, 0xfe])).is_err());
    }
}
