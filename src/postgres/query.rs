use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::{Row, Statement};

use crate::error::SqlDriverError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(stmt: &Statement, rows: &[Row]) -> Result<ResultSet, SqlDriverError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(column_names, rows.len());
    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extracts a `SqlValue` from a `tokio_postgres` Row at the given index.
///
/// Booleans read as integers and date/time or JSON columns read as text.
///
/// # Errors
/// Returns `SqlDriverError` if the column cannot be retrieved.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<SqlValue, SqlDriverError> {
    let type_name = row
        .columns()
        .get(idx)
        .ok_or_else(|| {
            SqlDriverError::ExecutionError(format!("column index {idx} out of range"))
        })?
        .type_()
        .name();

    let value = match type_name {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| SqlValue::Integer(i64::from(v))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| SqlValue::Integer(i64::from(v))),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::Integer),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| SqlValue::Real(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::Real),
        "bool" => row
            .try_get::<_, Option<bool>>(idx)?
            .map(|v| SqlValue::Integer(i64::from(v))),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| SqlValue::Text(v.to_rfc3339())),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| SqlValue::Text(v.to_string())),
        "json" | "jsonb" => row
            .try_get::<_, Option<Value>>(idx)?
            .map(|v| SqlValue::Text(v.to_string())),
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(SqlValue::Blob),
        // text, varchar, bpchar, name and anything else readable as a string
        _ => row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}
