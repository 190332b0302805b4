use std::error::Error;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::BoundValue;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl ToSql for BoundValue {
    /// Encode the value for the parameter type the server inferred.
    ///
    /// Integers narrow to `int2`/`int4` (out-of-range values are an error), doubles narrow to
    /// `float4`, text is parsed for JSON and date/time parameters, and typed nulls are sent as
    /// SQL `NULL` whatever the column type. Anything else is handed to the matching Rust type,
    /// which rejects a target of another kind, so an integer never lands in a float or bool.
    #[allow(clippy::cast_possible_truncation)]
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            BoundValue::Null(_) => Ok(IsNull::Yes),
            BoundValue::Long(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            BoundValue::Double(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            BoundValue::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql_checked(ty, out)
                }
                Type::TIMESTAMP => {
                    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)?.to_sql_checked(ty, out)
                }
                Type::TIMESTAMPTZ => {
                    DateTime::<FixedOffset>::parse_from_rfc3339(s)?.to_sql_checked(ty, out)
                }
                Type::DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql_checked(ty, out),
                _ => s.to_sql_checked(ty, out),
            },
            BoundValue::Bytes(b) => b.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
