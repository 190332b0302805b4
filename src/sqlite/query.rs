use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqlDriverError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Extract a `SqlValue` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlDriverError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, SqlDriverError> {
    let value: Value = row.get(idx).map_err(SqlDriverError::SqliteError)?;
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(i) => Ok(SqlValue::Integer(i)),
        Value::Real(f) => Ok(SqlValue::Real(f)),
        Value::Text(s) => Ok(SqlValue::Text(s)),
        Value::Blob(b) => Ok(SqlValue::Blob(b)),
    }
}

/// Step a statement whose parameters are already bound and collect every row.
///
/// # Errors
/// Returns `SqlDriverError::SqliteError` if stepping or reading a value fails.
pub fn build_result_set(stmt: &mut Statement<'_>) -> Result<ResultSet, SqlDriverError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_capacity(column_names, 10);

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
