//! Batch input and per-statement result types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One statement of a batch: SQL text, positional parameters and the
/// caller's id, echoed back in the matching [`BatchItem`].
#[derive(Debug, Clone, Deserialize)]
pub struct BatchStatement {
   pub sql: String,
   #[serde(default)]
   pub params: Vec<JsonValue>,
   pub id: String,
}

impl BatchStatement {
   pub fn new(sql: impl Into<String>, params: Vec<JsonValue>, id: impl Into<String>) -> Self {
      Self {
         sql: sql.into(),
         params,
         id: id.into(),
      }
   }
}

/// Result object of a successful statement.
///
/// Absent fields are omitted when serialized. In particular a query that
/// matched nothing has no `rows` key at all, which is how callers tell "no
/// match" apart from "not a query".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
   #[serde(skip_serializing_if = "Option::is_none")]
   pub rows_affected: Option<u64>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub insert_id: Option<i64>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub rows: Option<Vec<IndexMap<String, JsonValue>>>,
}

impl QueryResult {
   pub fn rows_affected(count: u64) -> Self {
      Self {
         rows_affected: Some(count),
         ..Default::default()
      }
   }

   pub fn inserted(insert_id: i64) -> Self {
      Self {
         rows_affected: Some(1),
         insert_id: Some(insert_id),
         rows: None,
      }
   }

   pub fn with_rows(rows: Vec<IndexMap<String, JsonValue>>) -> Self {
      Self {
         rows: Some(rows),
         ..Default::default()
      }
   }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementError {
   pub message: String,
}

/// Outcome of one statement, serialized as
/// `{"outcome": "success"|"error", "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "lowercase")]
pub enum StatementOutcome {
   Success(QueryResult),
   Error(StatementError),
}

/// Entry of a batch response, in the same position as its statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
   pub id: String,
   #[serde(flatten)]
   pub outcome: StatementOutcome,
}

impl BatchItem {
   pub fn success(id: impl Into<String>, result: QueryResult) -> Self {
      Self {
         id: id.into(),
         outcome: StatementOutcome::Success(result),
      }
   }

   pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
      Self {
         id: id.into(),
         outcome: StatementOutcome::Error(StatementError {
            message: message.into(),
         }),
      }
   }

   pub fn is_success(&self) -> bool {
      matches!(self.outcome, StatementOutcome::Success(_))
   }

   pub fn result(&self) -> Option<&QueryResult> {
      match &self.outcome {
         StatementOutcome::Success(result) => Some(result),
         StatementOutcome::Error(_) => None,
      }
   }

   pub fn error_message(&self) -> Option<&str> {
      match &self.outcome {
         StatementOutcome::Success(_) => None,
         StatementOutcome::Error(e) => Some(&e.message),
      }
   }
}
