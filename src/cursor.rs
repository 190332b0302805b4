use std::fmt;

use crate::error::SqlDriverError;
use crate::results::{ResultSet, SqlRow};
use crate::types::{ColumnType, SqlValue};

/// Deferred work run once when a cursor closes.
pub(crate) type OnClose = Box<dyn FnOnce()>;

/// Forward-only cursor over the rows of one query.
///
/// The cursor starts before the first row; call [`SqlCursor::advance`] to move onto it. Column
/// indexes are 0-based. Closing the cursor frees its rows and, when the query ran outside a
/// transaction, returns the connection to its provider. Dropping an open cursor closes it.
pub struct SqlCursor {
    rows: Option<ResultSet>,
    position: Option<usize>,
    on_close: Option<OnClose>,
}

impl SqlCursor {
    pub(crate) fn new(rows: ResultSet, on_close: Option<OnClose>) -> Self {
        Self {
            rows: Some(rows),
            position: None,
            on_close,
        }
    }

    /// Move to the next row. Returns whether a row is available.
    ///
    /// # Errors
    /// Returns `SqlDriverError::CursorError` if the cursor has been closed.
    pub fn advance(&mut self) -> Result<bool, SqlDriverError> {
        let len = self.rows()?.len();
        let next = self.position.map_or(0, |p| p.saturating_add(1));
        if next < len {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(len);
            Ok(false)
        }
    }

    /// # Errors
    /// Returns `SqlDriverError::CursorError` when there is no current row or column, or
    /// `SqlDriverError::ExecutionError` when the value cannot be read as text.
    pub fn get_string(&self, index: usize) -> Result<Option<String>, SqlDriverError> {
        self.value(index)?.as_string()
    }

    /// # Errors
    /// Returns `SqlDriverError::CursorError` when there is no current row or column.
    pub fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>, SqlDriverError> {
        self.value(index)?.as_bytes()
    }

    /// # Errors
    /// Returns `SqlDriverError::CursorError` when there is no current row or column, or
    /// `SqlDriverError::ExecutionError` when the value cannot be read as an integer.
    pub fn get_long(&self, index: usize) -> Result<Option<i64>, SqlDriverError> {
        self.value(index)?.as_long()
    }

    /// # Errors
    /// Returns `SqlDriverError::CursorError` when there is no current row or column, or
    /// `SqlDriverError::ExecutionError` when the value cannot be read as a real.
    pub fn get_double(&self, index: usize) -> Result<Option<f64>, SqlDriverError> {
        self.value(index)?.as_double()
    }

    /// Number of result columns, or `None` once closed.
    #[must_use]
    pub fn column_count(&self) -> Option<usize> {
        self.rows.as_ref().map(|rows| rows.column_names().len())
    }

    /// Name of the column at `index`, if known.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.rows
            .as_ref()
            .and_then(|rows| rows.column_names().get(index))
            .map(String::as_str)
    }

    /// Storage class of the value at `index` in the current row.
    ///
    /// The type is read from the row's value, so this is `None` before the first
    /// [`SqlCursor::advance`], after the last row, once closed, or for an unknown column.
    #[must_use]
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.current_row()
            .and_then(|row| row.get_by_index(index))
            .map(SqlValue::column_type)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Free the rows, then run the deferred release. Later calls do nothing.
    pub fn close(&mut self) {
        if self.rows.take().is_some() {
            self.position = None;
            if let Some(on_close) = self.on_close.take() {
                on_close();
            }
        }
    }

    fn rows(&self) -> Result<&ResultSet, SqlDriverError> {
        self.rows
            .as_ref()
            .ok_or_else(|| SqlDriverError::CursorError("cursor is closed".into()))
    }

    fn current_row(&self) -> Option<&SqlRow> {
        let rows = self.rows.as_ref()?;
        rows.results.get(self.position?)
    }

    fn value(&self, index: usize) -> Result<&SqlValue, SqlDriverError> {
        self.rows()?;
        let row = self.current_row().ok_or_else(|| {
            SqlDriverError::CursorError("cursor is not positioned on a row".into())
        })?;
        row.get_by_index(index).ok_or_else(|| {
            SqlDriverError::CursorError(format!(
                "column index {index} out of range for {} column(s)",
                row.len()
            ))
        })
    }
}

impl Drop for SqlCursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SqlCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCursor")
            .field("rows", &self.rows.as_ref().map(ResultSet::len))
            .field("position", &self.position)
            .field("closed", &self.is_closed())
            .finish()
    }
}
