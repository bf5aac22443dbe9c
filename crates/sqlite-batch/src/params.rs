//! Coercion of dynamically-typed JSON parameters into bound values

use serde_json::{Number, Value as JsonValue};
use sqlx_sqlite_capability::SqlValue;

/// Convert one JSON parameter into the value bound to the statement.
///
/// - `null` binds NULL
/// - a number with no fractional part that fits in `i64` binds INTEGER
/// - any other number binds REAL
/// - strings bind TEXT
/// - booleans, arrays and objects bind their JSON text (`true`, `[1,2]`, ...)
pub fn to_sql_value(value: &JsonValue) -> SqlValue {
   match value {
      JsonValue::Null => SqlValue::Null,
      JsonValue::String(s) => SqlValue::Text(s.clone()),
      JsonValue::Number(number) => number_to_sql(number),
      other => SqlValue::Text(other.to_string()),
   }
}

/// Convert a full parameter list, preserving order.
pub fn to_sql_values(values: &[JsonValue]) -> Vec<SqlValue> {
   values.iter().map(to_sql_value).collect()
}

fn number_to_sql(number: &Number) -> SqlValue {
   // Preserve integer precision by binding as i64 when possible
   if let Some(int_val) = number.as_i64() {
      return SqlValue::Integer(int_val);
   }

   // u64 beyond i64::MAX: SQLite's INTEGER can't hold it
   if let Some(uint_val) = number.as_u64() {
      return SqlValue::Real(uint_val as f64);
   }

   let float_val = number.as_f64().unwrap_or_default();
   // 2^63 is exactly representable, so `<` keeps the cast in range
   let fits_i64 = float_val >= i64::MIN as f64 && float_val < i64::MAX as f64;
   if float_val.fract() == 0.0 && fits_i64 {
      SqlValue::Integer(float_val as i64)
   } else {
      SqlValue::Real(float_val)
   }
}
