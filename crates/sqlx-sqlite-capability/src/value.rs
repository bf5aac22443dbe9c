/// Typed SQLite value.
///
/// Used both for parameters bound to a statement and for cells read back from
/// a query. The variants mirror SQLite's five storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
   Null,
   Integer(i64),
   Real(f64),
   Text(String),
   Blob(Vec<u8>),
}

impl From<i64> for SqlValue {
   fn from(value: i64) -> Self {
      SqlValue::Integer(value)
   }
}

impl From<f64> for SqlValue {
   fn from(value: f64) -> Self {
      SqlValue::Real(value)
   }
}

impl From<&str> for SqlValue {
   fn from(value: &str) -> Self {
      SqlValue::Text(value.to_string())
   }
}

impl From<String> for SqlValue {
   fn from(value: String) -> Self {
      SqlValue::Text(value)
   }
}

impl From<Vec<u8>> for SqlValue {
   fn from(value: Vec<u8>) -> Self {
      SqlValue::Blob(value)
   }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
   fn from(value: Option<T>) -> Self {
      value.map_or(SqlValue::Null, Into::into)
   }
}
