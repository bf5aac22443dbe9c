//! The database capability a session drives

use std::future::Future;

use indexmap::IndexMap;

use crate::{Result, SqlValue};

/// One result row: column name to typed cell, in cursor column order.
///
/// Duplicate column names keep the last cell, matching how a row object is
/// built on the host side.
pub type Row = IndexMap<String, SqlValue>;

/// Native database handle operated on by a single owner.
///
/// Statement methods bind `params` positionally (`?`, `?NNN`, `$N`) and
/// execute one statement. Transaction control follows the
/// begin / mark-successful / end protocol: [`Database::end_transaction`]
/// commits when [`Database::set_transaction_successful`] was called since the
/// matching [`Database::begin_transaction`], and rolls back otherwise.
///
/// ## Architecture
///
/// ```text
/// begin_transaction()            -> BEGIN
/// set_transaction_successful()   -> (flag only)
/// end_transaction()              -> COMMIT if flagged, else ROLLBACK
/// ```
pub trait Database: Send + 'static {
   /// Execute an UPDATE or DELETE, returning the number of rows changed.
   fn execute_update_delete(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> impl Future<Output = Result<u64>> + Send;

   /// Execute an INSERT, returning the new rowid, or `None` when no row was
   /// inserted (e.g. `INSERT OR IGNORE` hitting a conflict).
   fn execute_insert(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> impl Future<Output = Result<Option<i64>>> + Send;

   /// Run any statement and collect the rows it produces, if any.
   fn raw_query(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> impl Future<Output = Result<Vec<Row>>> + Send;

   fn begin_transaction(&mut self) -> impl Future<Output = Result<()>> + Send;

   /// Mark the current transaction as successful so that the next
   /// [`Database::end_transaction`] commits it.
   fn set_transaction_successful(&mut self) -> Result<()>;

   fn end_transaction(&mut self) -> impl Future<Output = Result<()>> + Send;

   /// Whether a transaction started through [`Database::begin_transaction`]
   /// is still pending.
   fn in_transaction(&self) -> bool;

   /// Close the native handle. A pending transaction is rolled back.
   fn close(self) -> impl Future<Output = Result<()>> + Send;
}
