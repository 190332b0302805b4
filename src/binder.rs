use crate::error::SqlDriverError;
use crate::types::{BoundValue, SqlType};

/// Binds positional parameters to a prepared statement.
///
/// Indexes are 0-based. A `None` argument binds a NULL tagged with the accessor's kind, so
/// `bind_long(0, None)` and `bind_string(0, None)` hand the client different placeholders.
pub trait SqlPreparedStatement {
    /// Bind an already-typed value at `index`.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ParameterError` if `index` is out of range, or the client's
    /// error if it rejects the value.
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError>;

    /// # Errors
    /// See [`SqlPreparedStatement::bind`].
    fn bind_bytes(&mut self, index: usize, bytes: Option<&[u8]>) -> Result<(), SqlDriverError> {
        let value = bytes.map_or(BoundValue::Null(SqlType::Blob), |b| {
            BoundValue::Bytes(b.to_vec())
        });
        self.bind(index, value)
    }

    /// # Errors
    /// See [`SqlPreparedStatement::bind`].
    fn bind_long(&mut self, index: usize, long: Option<i64>) -> Result<(), SqlDriverError> {
        self.bind(index, long.map_or(BoundValue::Null(SqlType::Integer), BoundValue::Long))
    }

    /// # Errors
    /// See [`SqlPreparedStatement::bind`].
    fn bind_double(&mut self, index: usize, double: Option<f64>) -> Result<(), SqlDriverError> {
        self.bind(index, double.map_or(BoundValue::Null(SqlType::Real), BoundValue::Double))
    }

    /// # Errors
    /// See [`SqlPreparedStatement::bind`].
    fn bind_string(&mut self, index: usize, string: Option<&str>) -> Result<(), SqlDriverError> {
        let value = string.map_or(BoundValue::Null(SqlType::Text), |s| {
            BoundValue::Text(s.to_owned())
        });
        self.bind(index, value)
    }
}

/// Callback that binds every parameter of a statement before it runs.
///
/// ```rust
/// use sql_driver::prelude::*;
///
/// let binders: Binders<'_> = &|stmt: &mut dyn SqlPreparedStatement| {
///     stmt.bind_long(0, Some(1))?;
///     stmt.bind_string(1, None)
/// };
/// let mut bindings = Bindings::with_parameter_count(2);
/// binders(&mut bindings)?;
/// assert_eq!(bindings.get(1), Some(&BoundValue::Null(SqlType::Text)));
/// # Ok::<(), SqlDriverError>(())
/// ```
pub type Binders<'a> = &'a dyn Fn(&mut dyn SqlPreparedStatement) -> Result<(), SqlDriverError>;

/// Positional parameter buffer for clients that take all parameters at execution time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    slots: Vec<Option<BoundValue>>,
}

impl Bindings {
    #[must_use]
    pub fn with_parameter_count(parameters: usize) -> Self {
        Self {
            slots: vec![None; parameters],
        }
    }

    /// Number of parameter slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The value bound at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BoundValue> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// All slots in parameter order; `None` marks a slot nothing was bound to.
    #[must_use]
    pub fn slots(&self) -> &[Option<BoundValue>] {
        &self.slots
    }

    /// Consume the buffer, requiring every slot to be bound.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ParameterError` naming the first unbound slot.
    pub fn into_values(self) -> Result<Vec<BoundValue>, SqlDriverError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    SqlDriverError::ParameterError(format!("parameter {index} was not bound"))
                })
            })
            .collect()
    }
}

impl SqlPreparedStatement for Bindings {
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            SqlDriverError::ParameterError(format!(
                "parameter index {index} out of range for {count} parameter(s)"
            ))
        })?;
        *slot = Some(value);
        Ok(())
    }
}
