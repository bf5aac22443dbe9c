//! # sqlite-batch
//!
//! Turns an ordered list of heterogeneous SQL statements into one ordered
//! response, running each statement through the [`Database`] capability with
//! the strategy its leading keyword selects.
//!
//! ## Core Types
//!
//! - **[`classify`]** / **[`StatementKind`]**: first-keyword statement categories
//! - **[`execute_batch`]**: ordered execution, one result per statement
//! - **[`BatchStatement`]** / **[`BatchItem`]**: batch input and output entries
//! - **[`QueryResult`]**: `rowsAffected` / `insertId` / `rows` of a successful statement
//!
//! ## Strategies
//!
//! | Kind | Capability call | Reported |
//! |------|-----------------|----------|
//! | update, delete | `execute_update_delete` | `rowsAffected` |
//! | insert | `execute_insert` | `insertId` + `rowsAffected: 1`, or `rowsAffected: 0` |
//! | begin / commit / rollback | transaction control | `rowsAffected: 0` |
//! | select, other | `raw_query` | `rows` when at least one row came back |
//!
//! [`Database`]: sqlx_sqlite_capability::Database

mod classify;
mod decode;
mod executor;
mod params;
mod result;

pub use classify::{StatementKind, classify};
pub use decode::{row_to_json, to_json};
pub use executor::{execute_batch, is_lone_commit};
pub use params::{to_sql_value, to_sql_values};
pub use result::{BatchItem, BatchStatement, QueryResult, StatementError, StatementOutcome};
