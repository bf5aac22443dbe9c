//! SQLx-backed implementation of [`Database`]

use std::path::PathBuf;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow, SqliteValueRef};
use sqlx::{Column, Connection, Row as _, Sqlite, TypeInfo, Value, ValueRef};
use tracing::{debug, warn};

use crate::{Database, Error, Result, Row, SqlValue};

/// Transaction opened through [`Database::begin_transaction`]
#[derive(Debug, Default)]
struct PendingTransaction {
   successful: bool,
}

/// A single SQLite connection owned by one session.
///
/// Unlike a pool, there is exactly one connection here: the session that owns
/// this value is the only code path that can reach it.
#[derive(Debug)]
pub struct SqlxDatabase {
   conn: SqliteConnection,

   /// Path the connection was opened from, for logging
   path: PathBuf,

   /// Set between `begin_transaction` and `end_transaction`
   transaction: Option<PendingTransaction>,
}

impl SqlxDatabase {
   pub(crate) fn new(conn: SqliteConnection, path: PathBuf) -> Self {
      Self {
         conn,
         path,
         transaction: None,
      }
   }
}

impl Database for SqlxDatabase {
   async fn execute_update_delete(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
      let result = build_query(sql, params).execute(&mut self.conn).await?;
      Ok(result.rows_affected())
   }

   async fn execute_insert(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<i64>> {
      let result = build_query(sql, params).execute(&mut self.conn).await?;

      // sqlite3_last_insert_rowid() keeps the previous value when nothing was
      // inserted, so only trust it when a row was actually written
      if result.rows_affected() == 0 {
         return Ok(None);
      }
      Ok(Some(result.last_insert_rowid()))
   }

   async fn raw_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
      let rows = build_query(sql, params).fetch_all(&mut self.conn).await?;
      rows.iter().map(decode_row).collect()
   }

   async fn begin_transaction(&mut self) -> Result<()> {
      sqlx::query("BEGIN IMMEDIATE")
         .execute(&mut self.conn)
         .await?;
      self.transaction = Some(PendingTransaction::default());
      Ok(())
   }

   fn set_transaction_successful(&mut self) -> Result<()> {
      match self.transaction.as_mut() {
         Some(tx) => {
            tx.successful = true;
            Ok(())
         }
         None => Err(Error::NoTransactionPending),
      }
   }

   async fn end_transaction(&mut self) -> Result<()> {
      let tx = self.transaction.take().ok_or(Error::NoTransactionPending)?;

      if !tx.successful {
         sqlx::query("ROLLBACK").execute(&mut self.conn).await?;
         debug!("Transaction rolled back for db: {}", self.path.display());
         return Ok(());
      }

      match sqlx::query("COMMIT").execute(&mut self.conn).await {
         Ok(_) => {
            debug!("Transaction committed for db: {}", self.path.display());
            Ok(())
         }
         Err(commit_err) => {
            // A failed COMMIT can leave the transaction open; never let it
            // leak into the next statement
            if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut self.conn).await {
               warn!(
                  "Rollback after failed commit also failed for db {}: {}",
                  self.path.display(),
                  rollback_err
               );
            }
            Err(commit_err.into())
         }
      }
   }

   fn in_transaction(&self) -> bool {
      self.transaction.is_some()
   }

   async fn close(self) -> Result<()> {
      if self.transaction.is_some() {
         debug!(
            "Closing db {} with a pending transaction (will auto-rollback)",
            self.path.display()
         );
      }
      self.conn.close().await?;
      Ok(())
   }
}

/// Bind a typed value to a SQLx query
fn bind_value<'q>(
   query: Query<'q, Sqlite, SqliteArguments<'q>>,
   value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
   match value {
      SqlValue::Null => query.bind(None::<i64>),
      SqlValue::Integer(v) => query.bind(*v),
      SqlValue::Real(v) => query.bind(*v),
      SqlValue::Text(v) => query.bind(v.clone()),
      SqlValue::Blob(v) => query.bind(v.clone()),
   }
}

fn build_query<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
   params.iter().fold(sqlx::query(sql), bind_value)
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
   let mut decoded = Row::with_capacity(row.columns().len());
   for (i, column) in row.columns().iter().enumerate() {
      let raw = row.try_get_raw(i)?;
      decoded.insert(column.name().to_string(), to_sql_value(raw)?);
   }
   Ok(decoded)
}

/// Decode a cell by its runtime storage class (not the declared column type)
fn to_sql_value(raw: SqliteValueRef<'_>) -> Result<SqlValue> {
   if raw.is_null() {
      return Ok(SqlValue::Null);
   }

   let type_info = raw.type_info();
   let value = ValueRef::to_owned(&raw);

   let decoded = match type_info.name() {
      "INTEGER" => SqlValue::Integer(value.try_decode::<i64>()?),
      "REAL" => SqlValue::Real(value.try_decode::<f64>()?),
      "TEXT" => SqlValue::Text(value.try_decode::<String>()?),
      "BLOB" => SqlValue::Blob(value.try_decode::<Vec<u8>>()?),
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };
   Ok(decoded)
}
