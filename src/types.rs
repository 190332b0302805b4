use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlDriverError;

/// The database backends this crate can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` over tokio-postgres
    #[cfg(feature = "postgres")]
    Postgres,
    /// `SQLite` over rusqlite
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Type tag carried by a null parameter so the client can encode a typed NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Blob,
    Integer,
    Real,
    Text,
}

/// A value bound to a statement parameter.
///
/// The five kinds never convert into one another; a null always remembers which kind of
/// value it stands in for:
/// ```rust
/// use sql_driver::prelude::*;
///
/// let typed_null = BoundValue::Null(SqlType::Integer);
/// assert!(typed_null.is_null());
/// assert_ne!(typed_null, BoundValue::Long(0));
/// assert_eq!(typed_null.sql_type(), SqlType::Integer);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Bytes(Vec<u8>),
    Long(i64),
    Double(f64),
    Text(String),
    Null(SqlType),
}

impl BoundValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// The declared kind of this value, including for nulls.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        match self {
            BoundValue::Bytes(_) => SqlType::Blob,
            BoundValue::Long(_) => SqlType::Integer,
            BoundValue::Double(_) => SqlType::Real,
            BoundValue::Text(_) => SqlType::Text,
            BoundValue::Null(ty) => *ty,
        }
    }
}

/// Storage class of a value read back from a result row.
///
/// `native_code` returns the `SQLite` fundamental datatype codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Null,
}

impl ColumnType {
    #[must_use]
    pub fn native_code(self) -> i32 {
        match self {
            ColumnType::Integer => 1,
            ColumnType::Real => 2,
            ColumnType::Text => 3,
            ColumnType::Blob => 4,
            ColumnType::Null => 5,
        }
    }
}

/// A single column value of a materialised result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            SqlValue::Null => ColumnType::Null,
            SqlValue::Integer(_) => ColumnType::Integer,
            SqlValue::Real(_) => ColumnType::Real,
            SqlValue::Text(_) => ColumnType::Text,
            SqlValue::Blob(_) => ColumnType::Blob,
        }
    }

    /// Read the value as a 64-bit integer. Reals truncate toward zero and numeric text parses.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ExecutionError` for blobs and non-numeric text.
    pub fn as_long(&self) -> Result<Option<i64>, SqlDriverError> {
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(*i)),
            #[allow(clippy::cast_possible_truncation)]
            SqlValue::Real(f) => Ok(Some(*f as i64)),
            SqlValue::Text(s) => s.trim().parse::<i64>().map(Some).map_err(|e| {
                SqlDriverError::ExecutionError(format!("cannot read text {s:?} as integer: {e}"))
            }),
            SqlValue::Blob(_) => Err(SqlDriverError::ExecutionError(
                "cannot read blob as integer".into(),
            )),
        }
    }

    /// Read the value as a 64-bit float. Integers widen and numeric text parses.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ExecutionError` for blobs and non-numeric text.
    pub fn as_double(&self) -> Result<Option<f64>, SqlDriverError> {
        match self {
            SqlValue::Null => Ok(None),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Integer(i) => Ok(Some(*i as f64)),
            SqlValue::Real(f) => Ok(Some(*f)),
            SqlValue::Text(s) => s.trim().parse::<f64>().map(Some).map_err(|e| {
                SqlDriverError::ExecutionError(format!("cannot read text {s:?} as real: {e}"))
            }),
            SqlValue::Blob(_) => Err(SqlDriverError::ExecutionError(
                "cannot read blob as real".into(),
            )),
        }
    }

    /// Read the value as text. Numbers render in their canonical form.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ExecutionError` for blobs that are not valid UTF-8.
    pub fn as_string(&self) -> Result<Option<String>, SqlDriverError> {
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(i.to_string())),
            SqlValue::Real(f) => Ok(Some(f.to_string())),
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).map(Some).map_err(|e| {
                SqlDriverError::ExecutionError(format!("blob is not valid UTF-8 text: {e}"))
            }),
        }
    }

    /// Read the value as raw bytes. Text yields its UTF-8 encoding.
    ///
    /// # Errors
    /// Never fails.
    pub fn as_bytes(&self) -> Result<Option<Vec<u8>>, SqlDriverError> {
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Blob(bytes) => Ok(Some(bytes.clone())),
            SqlValue::Text(s) => Ok(Some(s.as_bytes().to_vec())),
            SqlValue::Integer(i) => Ok(Some(i.to_string().into_bytes())),
            SqlValue::Real(f) => Ok(Some(f.to_string().into_bytes())),
        }
    }
}
