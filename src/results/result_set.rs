use std::sync::Arc;

use super::row::SqlRow;
use crate::types::SqlValue;

/// Rows produced by one query, in the order the client returned them.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<SqlRow>,
    column_names: Arc<Vec<String>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns, reserving room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
        }
    }

    /// Build a result set from column names and row values in one go.
    #[must_use]
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<SqlValue>>) -> ResultSet {
        let mut result_set = ResultSet::with_capacity(column_names, rows.len());
        for row in rows {
            result_set.add_row_values(row);
        }
        result_set
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append a row; values are expected in column order.
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        self.results
            .push(SqlRow::new(Arc::clone(&self.column_names), values));
    }
}
