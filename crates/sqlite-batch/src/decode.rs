use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx_sqlite_capability::{Row, SqlValue};

/// Convert a typed cell to JSON.
///
/// BLOBs become standard base64 text. Non-finite reals (which JSON can't
/// carry) become `null`.
pub fn to_json(value: SqlValue) -> JsonValue {
   match value {
      SqlValue::Null => JsonValue::Null,
      SqlValue::Integer(v) => JsonValue::from(v),
      SqlValue::Real(v) => serde_json::Number::from_f64(v)
         .map(JsonValue::Number)
         .unwrap_or(JsonValue::Null),
      SqlValue::Text(v) => JsonValue::String(v),
      SqlValue::Blob(v) => JsonValue::String(BASE64_STANDARD.encode(v)),
   }
}

/// Convert a row, keeping column order
pub fn row_to_json(row: Row) -> IndexMap<String, JsonValue> {
   row.into_iter()
      .map(|(column, value)| (column, to_json(value)))
      .collect()
}
