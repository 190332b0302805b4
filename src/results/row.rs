use std::sync::Arc;

use crate::types::SqlValue;

/// One row of a [`super::ResultSet`].
#[derive(Debug, Clone)]
pub struct SqlRow {
    /// Column names, shared by every row of the owning result set
    pub column_names: Arc<Vec<String>>,
    /// Values in column order
    pub values: Vec<SqlValue>,
}

impl SqlRow {
    pub(crate) fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Value at a 0-based column index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
