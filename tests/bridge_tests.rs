use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use serde_json::{Value as JsonValue, json};
use sqlite_session_bridge::{
   AttachRequest, BatchItem, BatchRequest, BatchStatement, Builder, Error, OpenOutcome,
   OpenRequest, QueryResult, SqliteBridge,
};
use sqlx_sqlite_capability::{
   ConnectionProvider, Database, OpenMode, Row, SqlValue, SqlxConnectionProvider, SqlxDatabase,
};
use tempfile::TempDir;

// ─── Helpers ───

fn init_tracing() {
   let _ = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_test_writer()
      .try_init();
}

fn create_bridge(temp: &TempDir) -> SqliteBridge {
   init_tracing();
   Builder::new().base_dir(temp.path()).build()
}

fn stmt(sql: &str, params: Vec<JsonValue>, id: &str) -> BatchStatement {
   BatchStatement::new(sql, params, id)
}

fn batch(name: &str, statements: Vec<BatchStatement>) -> BatchRequest {
   BatchRequest::new(name, statements)
}

fn rows(item: &BatchItem) -> &Vec<IndexMap<String, JsonValue>> {
   item
      .result()
      .and_then(|result| result.rows.as_ref())
      .expect("expected rows")
}

/// Provider that counts how often a database is opened
#[derive(Clone, Default)]
struct CountingProvider {
   inner: SqlxConnectionProvider,
   opens: Arc<AtomicUsize>,
}

impl CountingProvider {
   fn opens(&self) -> usize {
      self.opens.load(Ordering::SeqCst)
   }
}

impl ConnectionProvider for CountingProvider {
   type Database = SqlxDatabase;

   async fn open(&self, path: &Path, mode: OpenMode) -> sqlx_sqlite_capability::Result<SqlxDatabase> {
      self.opens.fetch_add(1, Ordering::SeqCst);
      // Widen the window in which concurrent opens could race
      tokio::time::sleep(std::time::Duration::from_millis(20)).await;
      self.inner.open(path, mode).await
   }
}

/// Database that panics on statements starting with `PANIC`
struct PanickyDatabase(SqlxDatabase);

impl Database for PanickyDatabase {
   async fn execute_update_delete(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> sqlx_sqlite_capability::Result<u64> {
      self.0.execute_update_delete(sql, params).await
   }

   async fn execute_insert(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> sqlx_sqlite_capability::Result<Option<i64>> {
      self.0.execute_insert(sql, params).await
   }

   async fn raw_query(
      &mut self,
      sql: &str,
      params: &[SqlValue],
   ) -> sqlx_sqlite_capability::Result<Vec<Row>> {
      if sql.starts_with("PANIC") {
         panic!("raw_query exploded");
      }
      self.0.raw_query(sql, params).await
   }

   async fn begin_transaction(&mut self) -> sqlx_sqlite_capability::Result<()> {
      self.0.begin_transaction().await
   }

   fn set_transaction_successful(&mut self) -> sqlx_sqlite_capability::Result<()> {
      self.0.set_transaction_successful()
   }

   async fn end_transaction(&mut self) -> sqlx_sqlite_capability::Result<()> {
      self.0.end_transaction().await
   }

   fn in_transaction(&self) -> bool {
      self.0.in_transaction()
   }

   async fn close(self) -> sqlx_sqlite_capability::Result<()> {
      self.0.close().await
   }
}

#[derive(Default)]
struct PanickyProvider(SqlxConnectionProvider);

impl ConnectionProvider for PanickyProvider {
   type Database = PanickyDatabase;

   async fn open(&self, path: &Path, mode: OpenMode) -> sqlx_sqlite_capability::Result<PanickyDatabase> {
      Ok(PanickyDatabase(self.0.open(path, mode).await?))
   }
}

async fn seed_database(path: &Path, statements: &[&str]) {
   std::fs::create_dir_all(path.parent().unwrap()).unwrap();
   let mut db = SqlxConnectionProvider::default()
      .open(path, OpenMode::ReadWriteCreate)
      .await
      .unwrap();
   for sql in statements {
      db.raw_query(sql, &[]).await.unwrap();
   }
   db.close().await.unwrap();
}

// ─── Lifecycle ───

#[tokio::test]
async fn open_batch_close() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   assert_eq!(bridge.open(OpenRequest::new("main.db")).await.unwrap(), OpenOutcome::Opened);
   assert!(bridge.is_open("main.db"));
   assert_eq!(bridge.open_databases(), vec!["main.db"]);
   assert!(temp.path().join("databases").join("main.db").exists());

   let results = bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", vec![], "create"),
            stmt("INSERT INTO t (v) VALUES (?)", vec![json!("a")], "insert"),
            stmt("SELECT id, v FROM t", vec![], "select"),
         ],
      ))
      .await
      .unwrap();

   assert_eq!(results.len(), 3);
   assert_eq!(results[1].result(), Some(&QueryResult::inserted(1)));
   assert_eq!(rows(&results[2])[0]["v"], json!("a"));

   bridge.close("main.db").await.unwrap();
   assert!(!bridge.is_open("main.db"));
   assert!(bridge.open_databases().is_empty());
}

#[tokio::test]
async fn reopen_after_close_keeps_data() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   bridge.open(OpenRequest::new("main.db")).await.unwrap();
   bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("CREATE TABLE t (v INTEGER)", vec![], "0"),
            stmt("INSERT INTO t VALUES (42)", vec![], "1"),
         ],
      ))
      .await
      .unwrap();
   bridge.close("main.db").await.unwrap();

   assert_eq!(bridge.open(OpenRequest::new("main.db")).await.unwrap(), OpenOutcome::Opened);
   let results = bridge
      .execute_batch(batch("main.db", vec![stmt("SELECT v FROM t", vec![], "s")]))
      .await
      .unwrap();
   assert_eq!(rows(&results[0])[0]["v"], json!(42));

   bridge.close("main.db").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_create_one_session() {
   let temp = TempDir::new().unwrap();
   init_tracing();
   let provider = CountingProvider::default();
   let bridge = Builder::new()
      .base_dir(temp.path())
      .provider(provider.clone())
      .build();

   let outcomes = futures::future::join_all(
      (0..8).map(|_| bridge.open(OpenRequest::new("shared.db"))),
   )
   .await;

   let outcomes: Vec<OpenOutcome> = outcomes.into_iter().map(Result::unwrap).collect();
   assert_eq!(outcomes.iter().filter(|o| **o == OpenOutcome::Opened).count(), 1);
   assert_eq!(outcomes.iter().filter(|o| **o == OpenOutcome::AlreadyOpen).count(), 7);
   assert_eq!(provider.opens(), 1);

   bridge.close("shared.db").await.unwrap();
}

#[tokio::test]
async fn close_unknown_database_succeeds() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.close("never-opened.db").await.unwrap();
}

#[tokio::test]
async fn batch_on_unopened_database_fails_synchronously() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   let err = bridge
      .submit_batch(batch("nope.db", vec![stmt("SELECT 1", vec![], "s")]))
      .err()
      .unwrap();
   assert!(matches!(err, Error::DatabaseNotOpen(name) if name == "nope.db"));
}

#[tokio::test]
async fn batch_after_close_is_rejected() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   bridge.open(OpenRequest::new("main.db")).await.unwrap();
   bridge.close("main.db").await.unwrap();

   let err = bridge
      .execute_batch(batch("main.db", vec![stmt("SELECT 1", vec![], "s")]))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "DATABASE_NOT_OPEN");
   assert!(err.to_string().contains("database not open"));
}

#[tokio::test]
async fn commands_queued_behind_close_are_rejected() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.open(OpenRequest::new("main.db")).await.unwrap();

   let first = bridge
      .submit_batch(batch("main.db", vec![stmt("SELECT 1 AS one", vec![], "first")]))
      .unwrap();

   // The first poll queues the close
   let mut close = Box::pin(bridge.close("main.db"));
   let _ = futures::poll!(close.as_mut());

   let late = match bridge.submit_batch(batch("main.db", vec![stmt("SELECT 2", vec![], "late")])) {
      Ok(pending) => pending.await,
      Err(e) => Err(e),
   };

   let first = first.await.unwrap();
   assert_eq!(rows(&first[0])[0]["one"], json!(1));
   assert!(matches!(late, Err(Error::DatabaseNotOpen(_))));
   close.await.unwrap();
}

#[tokio::test]
async fn failed_open_leaves_no_session() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   let err = bridge
      .open(OpenRequest::new("seeded.db").asset_source("1"))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "ASSET_NOT_FOUND");
   assert!(!bridge.is_open("seeded.db"));
   assert!(bridge.open_databases().is_empty());

   seed_database(
      &temp.path().join("assets").join("www").join("seeded.db"),
      &["CREATE TABLE t (v INTEGER)"],
   )
   .await;

   let outcome = bridge
      .open(OpenRequest::new("seeded.db").asset_source("1"))
      .await
      .unwrap();
   assert_eq!(outcome, OpenOutcome::Opened);
   bridge.close("seeded.db").await.unwrap();
}

#[tokio::test]
async fn read_only_open_of_missing_file_fails() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   let err = bridge
      .open(OpenRequest::new("ro.db").asset_source("missing.db").read_only(true))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "OPEN_FAILED");
   assert!(!bridge.is_open("ro.db"));
}

// ─── Ordering ───

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batches_run_in_submission_order() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.open(OpenRequest::new("counter.db")).await.unwrap();

   bridge
      .execute_batch(batch(
         "counter.db",
         vec![
            stmt("CREATE TABLE counter (n INTEGER)", vec![], "create"),
            stmt("INSERT INTO counter VALUES (0)", vec![], "seed"),
         ],
      ))
      .await
      .unwrap();

   let pending: Vec<_> = (0..50)
      .map(|i| {
         bridge
            .submit_batch(batch(
               "counter.db",
               vec![
                  stmt("UPDATE counter SET n = n + 1", vec![], &format!("inc{i}")),
                  stmt("SELECT n FROM counter", vec![], &format!("read{i}")),
               ],
            ))
            .unwrap()
      })
      .collect();

   let observed: Vec<i64> = futures::future::join_all(pending)
      .await
      .into_iter()
      .map(|results| {
         let results = results.unwrap();
         rows(&results[1])[0]["n"].as_i64().unwrap()
      })
      .collect();

   assert_eq!(observed, (1..=50).collect::<Vec<i64>>());
   bridge.close("counter.db").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn databases_are_independent() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   for name in ["a.db", "b.db"] {
      bridge.open(OpenRequest::new(name)).await.unwrap();
      bridge
         .execute_batch(batch(name, vec![stmt("CREATE TABLE t (v TEXT)", vec![], "c")]))
         .await
         .unwrap();
   }

   let (a, b) = tokio::join!(
      bridge.execute_batch(batch("a.db", vec![stmt("INSERT INTO t VALUES ('a')", vec![], "i")])),
      bridge.execute_batch(batch("b.db", vec![stmt("INSERT INTO t VALUES ('b')", vec![], "i")])),
   );
   assert!(a.unwrap()[0].is_success());
   assert!(b.unwrap()[0].is_success());

   bridge.close("a.db").await.unwrap();
   let err = bridge
      .execute_batch(batch("a.db", vec![stmt("SELECT v FROM t", vec![], "s")]))
      .await
      .unwrap_err();
   assert!(matches!(err, Error::DatabaseNotOpen(_)));

   let results = bridge
      .execute_batch(batch("b.db", vec![stmt("SELECT v FROM t", vec![], "s")]))
      .await
      .unwrap();
   assert_eq!(rows(&results[0])[0]["v"], json!("b"));

   bridge.close_all().await;
}

// ─── Batch behavior through a session ───

#[tokio::test]
async fn statement_failure_is_isolated() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.open(OpenRequest::new("main.db")).await.unwrap();

   let results = bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("CREATE TABLE t (code TEXT UNIQUE)", vec![], "0"),
            stmt("INSERT INTO t VALUES (?)", vec![json!("x")], "1"),
            stmt("INSERT INTO t VALUES (?)", vec![json!("x")], "2"),
            stmt("SELECT count(*) AS c FROM t", vec![], "3"),
            stmt("SELECT * FROM t WHERE code = 'none'", vec![], "4"),
         ],
      ))
      .await
      .unwrap();

   assert!(
      results[2]
         .error_message()
         .unwrap()
         .contains("UNIQUE constraint failed")
   );
   assert_eq!(rows(&results[3])[0]["c"], json!(1));
   assert_eq!(results[4].result(), Some(&QueryResult::default()));

   let payload = serde_json::to_value(&results).unwrap();
   assert_eq!(payload[2]["outcome"], json!("error"));
   assert_eq!(payload[4], json!({"id": "4", "outcome": "success", "payload": {}}));

   bridge.close("main.db").await.unwrap();
}

#[tokio::test]
async fn transaction_spans_batches() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.open(OpenRequest::new("main.db")).await.unwrap();

   bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("CREATE TABLE t (v INTEGER)", vec![], "0"),
            stmt("BEGIN", vec![], "1"),
            stmt("INSERT INTO t VALUES (1)", vec![], "2"),
         ],
      ))
      .await
      .unwrap();

   let results = bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("ROLLBACK", vec![], "3"),
            stmt("SELECT count(*) AS c FROM t", vec![], "4"),
         ],
      ))
      .await
      .unwrap();

   assert_eq!(results[0].result(), Some(&QueryResult::rows_affected(0)));
   assert_eq!(rows(&results[1])[0]["c"], json!(0));

   bridge.close("main.db").await.unwrap();
}

#[tokio::test]
async fn panic_in_batch_is_reported_and_session_survives() {
   let temp = TempDir::new().unwrap();
   init_tracing();
   let bridge = Builder::new()
      .base_dir(temp.path())
      .provider(PanickyProvider::default())
      .build();
   bridge.open(OpenRequest::new("main.db")).await.unwrap();

   let err = bridge
      .execute_batch(batch("main.db", vec![stmt("PANIC NOW", vec![], "p")]))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "INTERNAL_ERROR");
   assert!(err.to_string().contains("raw_query exploded"));

   let results = bridge
      .execute_batch(batch("main.db", vec![stmt("SELECT 1 AS one", vec![], "s")]))
      .await
      .unwrap();
   assert_eq!(rows(&results[0])[0]["one"], json!(1));

   bridge.close("main.db").await.unwrap();
}

// ─── Lock workaround ───

#[tokio::test]
async fn lone_commit_reopens_handle() {
   let temp = TempDir::new().unwrap();
   init_tracing();
   let provider = CountingProvider::default();
   let bridge = Builder::new()
      .base_dir(temp.path())
      .provider(provider.clone())
      .build();

   bridge
      .open(OpenRequest::new("main.db").lock_workaround(true))
      .await
      .unwrap();
   assert_eq!(provider.opens(), 1);

   bridge
      .execute_batch(batch(
         "main.db",
         vec![
            stmt("CREATE TABLE t (v INTEGER)", vec![], "0"),
            stmt("BEGIN", vec![], "1"),
            stmt("INSERT INTO t VALUES (7)", vec![], "2"),
         ],
      ))
      .await
      .unwrap();
   assert_eq!(provider.opens(), 1);

   let results = bridge
      .execute_batch(batch("main.db", vec![stmt("COMMIT", vec![], "c")]))
      .await
      .unwrap();
   assert!(results[0].is_success());

   let results = bridge
      .execute_batch(batch("main.db", vec![stmt("SELECT v FROM t", vec![], "s")]))
      .await
      .unwrap();
   assert_eq!(rows(&results[0])[0]["v"], json!(7));
   assert_eq!(provider.opens(), 2);

   bridge.close("main.db").await.unwrap();
}

#[tokio::test]
async fn commit_does_not_reopen_without_workaround() {
   let temp = TempDir::new().unwrap();
   init_tracing();
   let provider = CountingProvider::default();
   let bridge = Builder::new()
      .base_dir(temp.path())
      .provider(provider.clone())
      .build();

   bridge.open(OpenRequest::new("main.db")).await.unwrap();
   bridge
      .execute_batch(batch("main.db", vec![stmt("BEGIN", vec![], "b")]))
      .await
      .unwrap();
   bridge
      .execute_batch(batch("main.db", vec![stmt("COMMIT", vec![], "c")]))
      .await
      .unwrap();
   assert_eq!(provider.opens(), 1);

   bridge.close("main.db").await.unwrap();
}

// ─── Assets ───

#[tokio::test]
async fn bundled_asset_is_copied_once() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   let asset = temp.path().join("assets").join("www").join("seeded.db");
   seed_database(
      &asset,
      &["CREATE TABLE t (v TEXT)", "INSERT INTO t VALUES ('from asset')"],
   )
   .await;

   bridge
      .open(OpenRequest::new("seeded.db").asset_source("1"))
      .await
      .unwrap();
   bridge
      .execute_batch(batch(
         "seeded.db",
         vec![stmt("INSERT INTO t VALUES ('local')", vec![], "i")],
      ))
      .await
      .unwrap();
   bridge.close("seeded.db").await.unwrap();

   // The existing database must not be replaced by the asset again
   bridge
      .open(OpenRequest::new("seeded.db").asset_source("1"))
      .await
      .unwrap();
   let results = bridge
      .execute_batch(batch("seeded.db", vec![stmt("SELECT v FROM t ORDER BY rowid", vec![], "s")]))
      .await
      .unwrap();
   let values: Vec<&JsonValue> = rows(&results[0]).iter().map(|row| &row["v"]).collect();
   assert_eq!(values, vec![&json!("from asset"), &json!("local")]);

   bridge.close("seeded.db").await.unwrap();
}

#[tokio::test]
async fn read_only_files_asset_is_opened_in_place() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   seed_database(
      &temp.path().join("files").join("imports").join("ref.db"),
      &["CREATE TABLE t (v INTEGER)", "INSERT INTO t VALUES (1)"],
   )
   .await;

   bridge
      .open(OpenRequest::new("ref.db").asset_source("/imports/ref.db").read_only(true))
      .await
      .unwrap();

   let results = bridge
      .execute_batch(batch(
         "ref.db",
         vec![
            stmt("SELECT v FROM t", vec![], "s"),
            stmt("INSERT INTO t VALUES (2)", vec![], "i"),
         ],
      ))
      .await
      .unwrap();

   assert_eq!(rows(&results[0])[0]["v"], json!(1));
   assert!(!results[1].is_success());
   assert!(!temp.path().join("databases").join("ref.db").exists());

   bridge.close("ref.db").await.unwrap();
}

#[tokio::test]
async fn delete_read_only_files_asset_keeps_asset() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   let asset = temp.path().join("files").join("imports").join("ref.db");
   let database = temp.path().join("databases").join("ref.db");
   seed_database(&asset, &["CREATE TABLE t (v INTEGER)"]).await;
   seed_database(&database, &["CREATE TABLE t (v INTEGER)"]).await;

   bridge
      .open(OpenRequest::new("ref.db").asset_source("/imports/ref.db").read_only(true))
      .await
      .unwrap();
   bridge.delete("ref.db").await.unwrap();

   assert!(asset.exists());
   assert!(!database.exists());
   assert!(!bridge.is_open("ref.db"));
}

// ─── Delete ───

#[tokio::test]
async fn delete_open_database() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   let path = temp.path().join("databases").join("gone.db");

   bridge.open(OpenRequest::new("gone.db")).await.unwrap();
   bridge
      .execute_batch(batch("gone.db", vec![stmt("CREATE TABLE t (v INTEGER)", vec![], "c")]))
      .await
      .unwrap();
   assert!(path.exists());

   bridge.delete("gone.db").await.unwrap();
   assert!(!path.exists());
   assert!(!bridge.is_open("gone.db"));

   let err = bridge.delete("gone.db").await.unwrap_err();
   assert_eq!(err.error_code(), "DELETE_FAILED");
}

#[tokio::test]
async fn delete_closed_database() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   let path = temp.path().join("databases").join("closed.db");

   bridge.open(OpenRequest::new("closed.db")).await.unwrap();
   bridge.close("closed.db").await.unwrap();
   assert!(path.exists());

   bridge.delete("closed.db").await.unwrap();
   assert!(!path.exists());
}

// ─── Attach ───

#[tokio::test]
async fn attach_open_database() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   bridge.open(OpenRequest::new("main.db")).await.unwrap();
   bridge.open(OpenRequest::new("other.db")).await.unwrap();
   bridge
      .execute_batch(batch(
         "other.db",
         vec![
            stmt("CREATE TABLE t (v TEXT)", vec![], "c"),
            stmt("INSERT INTO t VALUES ('there')", vec![], "i"),
         ],
      ))
      .await
      .unwrap();

   bridge
      .attach(AttachRequest {
         name: "main.db".into(),
         other_name: "other.db".into(),
         alias: "other".into(),
      })
      .await
      .unwrap();

   let results = bridge
      .execute_batch(batch("main.db", vec![stmt("SELECT v FROM other.t", vec![], "s")]))
      .await
      .unwrap();
   assert_eq!(rows(&results[0])[0]["v"], json!("there"));

   bridge.close_all().await;
}

#[tokio::test]
async fn attach_rejects_bad_alias_and_closed_database() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   bridge.open(OpenRequest::new("main.db")).await.unwrap();

   let err = bridge
      .attach(AttachRequest {
         name: "main.db".into(),
         other_name: "main.db".into(),
         alias: "x; DROP TABLE t".into(),
      })
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "INVALID_ALIAS");

   let err = bridge
      .attach(AttachRequest {
         name: "main.db".into(),
         other_name: "closed.db".into(),
         alias: "other".into(),
      })
      .await
      .unwrap_err();
   assert!(matches!(err, Error::DatabaseNotOpen(name) if name == "closed.db"));

   bridge.close("main.db").await.unwrap();
}

// ─── Close all ───

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_all_closes_every_session() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);

   for name in ["a.db", "b.db", "c.db"] {
      bridge.open(OpenRequest::new(name)).await.unwrap();
   }
   let queued: Vec<_> = (0..20)
      .map(|i| {
         bridge
            .submit_batch(batch("a.db", vec![stmt("SELECT 1", vec![], &format!("q{i}"))]))
            .unwrap()
      })
      .collect();

   bridge.close_all().await;

   assert!(bridge.open_databases().is_empty());
   for name in ["a.db", "b.db", "c.db"] {
      assert!(!bridge.is_open(name));
   }

   // Queued batches either ran before the shutdown or were rejected
   for result in futures::future::join_all(queued).await {
      match result {
         Ok(items) => assert!(items[0].is_success()),
         Err(e) => assert!(matches!(e, Error::DatabaseNotOpen(_))),
      }
   }

   let err = bridge
      .execute_batch(batch("b.db", vec![stmt("SELECT 1", vec![], "s")]))
      .await
      .unwrap_err();
   assert!(matches!(err, Error::DatabaseNotOpen(_)));

   // Closed sessions can be opened again
   assert_eq!(bridge.open(OpenRequest::new("a.db")).await.unwrap(), OpenOutcome::Opened);
   bridge.close_all().await;
}

#[tokio::test]
async fn echo_returns_input() {
   let temp = TempDir::new().unwrap();
   let bridge = create_bridge(&temp);
   assert_eq!(bridge.echo("hello".to_string()), "hello");
}
