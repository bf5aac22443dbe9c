//! Lexical statement classification.
//!
//! The category of a statement picks the capability call used to run it and
//! decides which metadata (rows affected, insert id, rows) is reported. It is
//! computed from the first keyword only, before anything is executed, so the
//! engine's response never changes how a statement is interpreted.

use std::fmt;

/// Coarse category of a SQL statement, from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
   Select,
   Insert,
   Update,
   Delete,
   Begin,
   Commit,
   Rollback,
   /// Anything else, including empty input
   Other,
}

const KEYWORDS: [(&str, StatementKind); 7] = [
   ("select", StatementKind::Select),
   ("insert", StatementKind::Insert),
   ("update", StatementKind::Update),
   ("delete", StatementKind::Delete),
   ("begin", StatementKind::Begin),
   ("commit", StatementKind::Commit),
   ("rollback", StatementKind::Rollback),
];

impl StatementKind {
   pub fn as_str(self) -> &'static str {
      match self {
         StatementKind::Select => "select",
         StatementKind::Insert => "insert",
         StatementKind::Update => "update",
         StatementKind::Delete => "delete",
         StatementKind::Begin => "begin",
         StatementKind::Commit => "commit",
         StatementKind::Rollback => "rollback",
         StatementKind::Other => "other",
      }
   }

   /// Whether the statement drives the capability's transaction control
   /// instead of being executed as SQL.
   pub fn is_transaction_control(self) -> bool {
      matches!(
         self,
         StatementKind::Begin | StatementKind::Commit | StatementKind::Rollback
      )
   }
}

impl fmt::Display for StatementKind {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Classify a statement by its first whitespace-delimited token.
///
/// Matching is ASCII case-insensitive. The token must be exactly one of the
/// known keywords: `BEGIN;` or `SELECT*` are `Other`.
pub fn classify(sql: &str) -> StatementKind {
   let Some(token) = sql
      .split(|c: char| c.is_ascii_whitespace())
      .find(|token| !token.is_empty())
   else {
      return StatementKind::Other;
   };

   KEYWORDS
      .iter()
      .find(|(keyword, _)| token.eq_ignore_ascii_case(keyword))
      .map_or(StatementKind::Other, |(_, kind)| *kind)
}
