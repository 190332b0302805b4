use rusqlite::types::Value;

use crate::types::BoundValue;

/// Convert a bound parameter into the value rusqlite binds.
///
/// `SQLite` NULLs carry no type, so every typed null maps to `Value::Null`.
#[must_use]
pub fn bound_value_to_sqlite_value(value: BoundValue) -> Value {
    match value {
        BoundValue::Bytes(bytes) => Value::Blob(bytes),
        BoundValue::Long(i) => Value::Integer(i),
        BoundValue::Double(f) => Value::Real(f),
        BoundValue::Text(s) => Value::Text(s),
        BoundValue::Null(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    #[test]
    fn typed_nulls_bind_as_sqlite_null() {
        for ty in [SqlType::Blob, SqlType::Integer, SqlType::Real, SqlType::Text] {
            assert_eq!(bound_value_to_sqlite_value(BoundValue::Null(ty)), Value::Null);
        }
    }

    #[test]
    fn values_keep_their_storage_class() {
        assert_eq!(bound_value_to_sqlite_value(BoundValue::Long(0)), Value::Integer(0));
        assert_eq!(bound_value_to_sqlite_value(BoundValue::Double(1.5)), Value::Real(1.5));
        assert_eq!(
            bound_value_to_sqlite_value(BoundValue::Text(String::new())),
            Value::Text(String::new())
        );
        assert_eq!(
            bound_value_to_sqlite_value(BoundValue::Bytes(vec![0xff])),
            Value::Blob(vec![0xff])
        );
    }
}
