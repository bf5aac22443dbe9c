//! Ordered execution of a statement batch against a [`Database`]

use sqlx_sqlite_capability::{Database, SqlValue};
use tracing::{debug, trace};

use crate::classify::{StatementKind, classify};
use crate::decode::row_to_json;
use crate::params::to_sql_values;
use crate::result::{BatchItem, BatchStatement, QueryResult};

/// Execute `statements` in order and return one [`BatchItem`] per statement,
/// in input order.
///
/// A failing statement is recorded as an error item and execution continues
/// with the next one; the batch itself never fails. Statements are never
/// reordered or run concurrently because later statements may depend on a
/// transaction opened by an earlier one.
pub async fn execute_batch<D: Database>(
   db: &mut D,
   statements: Vec<BatchStatement>,
) -> Vec<BatchItem> {
   let mut results = Vec::with_capacity(statements.len());

   for statement in statements {
      let kind = classify(&statement.sql);
      let params = to_sql_values(&statement.params);

      trace!(id = %statement.id, kind = %kind, "Executing statement");

      let item = match execute_statement(db, kind, &statement.sql, &params).await {
         Ok(result) => BatchItem::success(statement.id, result),
         Err(e) => {
            debug!(id = %statement.id, kind = %kind, error = %e, "Statement failed");
            BatchItem::error(statement.id, e.message())
         }
      };
      results.push(item);
   }

   results
}

/// Run one statement using the strategy chosen by its kind
async fn execute_statement<D: Database>(
   db: &mut D,
   kind: StatementKind,
   sql: &str,
   params: &[SqlValue],
) -> sqlx_sqlite_capability::Result<QueryResult> {
   match kind {
      StatementKind::Update | StatementKind::Delete => {
         let rows_affected = db.execute_update_delete(sql, params).await?;
         Ok(QueryResult::rows_affected(rows_affected))
      }
      StatementKind::Insert => match db.execute_insert(sql, params).await? {
         Some(insert_id) if insert_id > 0 => Ok(QueryResult::inserted(insert_id)),
         _ => Ok(QueryResult::rows_affected(0)),
      },
      StatementKind::Begin => {
         db.begin_transaction().await?;
         Ok(QueryResult::rows_affected(0))
      }
      StatementKind::Commit => {
         db.set_transaction_successful()?;
         db.end_transaction().await?;
         Ok(QueryResult::rows_affected(0))
      }
      StatementKind::Rollback => {
         db.end_transaction().await?;
         Ok(QueryResult::rows_affected(0))
      }
      StatementKind::Select | StatementKind::Other => {
         let rows = db.raw_query(sql, params).await?;
         if rows.is_empty() {
            return Ok(QueryResult::default());
         }
         Ok(QueryResult::with_rows(
            rows.into_iter().map(row_to_json).collect(),
         ))
      }
   }
}

/// Whether a batch is exactly one statement reading `COMMIT`, the trigger for
/// the close-and-reopen lock workaround.
pub fn is_lone_commit(statements: &[BatchStatement]) -> bool {
   matches!(statements, [only] if only.sql == "COMMIT")
}
