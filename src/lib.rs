//! # sqlite-session-bridge
//!
//! Exposes SQLite to an asynchronous host runtime as named databases, each
//! served by its own session task. Work for one database runs strictly in the
//! order it was submitted while different databases proceed in parallel.
//!
//! ## Core Types
//!
//! - **[`SqliteBridge`]**: the service object; open, close, delete, batch, attach
//! - **[`Builder`]**: configures directories and the connection provider
//! - **[`OpenRequest`]** / **[`BatchRequest`]** / **[`AttachRequest`]**: host requests
//! - **[`Pending`]**: reply to a batch that has been queued but not yet run
//! - **[`Error`]**: bridge errors, serialized as `{ code, message }`
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlite_session_bridge::{BatchRequest, BatchStatement, Builder, OpenRequest};
//!
//! # async fn example() -> sqlite_session_bridge::Result<()> {
//! let bridge = Builder::new().base_dir("/var/lib/app").build();
//!
//! bridge.open(OpenRequest::new("main.db")).await?;
//!
//! let results = bridge
//!    .execute_batch(BatchRequest::new(
//!       "main.db",
//!       vec![
//!          BatchStatement::new("CREATE TABLE IF NOT EXISTS t (v TEXT)", vec![], "create"),
//!          BatchStatement::new("INSERT INTO t (v) VALUES (?)", vec![json!("a")], "insert"),
//!          BatchStatement::new("SELECT v FROM t", vec![], "select"),
//!       ],
//!    ))
//!    .await?;
//! assert_eq!(results.len(), 3);
//!
//! bridge.close("main.db").await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use sqlx_sqlite_capability::{ConnectionConfig, ConnectionProvider, SqlxConnectionProvider};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

mod config;
mod error;
mod registry;
mod request;
mod session;
mod storage;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use request::{AttachRequest, BatchRequest, OpenOutcome, OpenRequest};
pub use session::{Pending, SessionState};

pub use sqlite_batch::{BatchItem, BatchStatement, QueryResult, StatementOutcome};

use registry::Registry;
use session::{Command, Session};

/// Builder for [`SqliteBridge`].
///
/// # Example
///
/// ```ignore
/// use sqlite_session_bridge::{BridgeConfig, Builder};
///
/// let bridge = Builder::new()
///    .config(BridgeConfig {
///       lock_workaround: true,
///       ..BridgeConfig::with_base_dir(app_dir)
///    })
///    .build();
/// ```
pub struct Builder<P = SqlxConnectionProvider> {
   config: BridgeConfig,
   provider: P,
}

impl Builder {
   /// Create a builder using the SQLx provider with default settings.
   pub fn new() -> Self {
      Self {
         config: BridgeConfig::default(),
         provider: SqlxConnectionProvider::default(),
      }
   }

   /// Settings for every connection the SQLx provider opens.
   pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
      self.provider = SqlxConnectionProvider::new(config);
      self
   }
}

impl Default for Builder {
   fn default() -> Self {
      Self::new()
   }
}

impl<P: ConnectionProvider> Builder<P> {
   pub fn config(mut self, config: BridgeConfig) -> Self {
      self.config = config;
      self
   }

   /// Shorthand for [`BridgeConfig::with_base_dir`], keeping the lock
   /// workaround setting.
   pub fn base_dir(mut self, base: impl AsRef<Path>) -> Self {
      self.config = BridgeConfig {
         lock_workaround: self.config.lock_workaround,
         ..BridgeConfig::with_base_dir(base)
      };
      self
   }

   /// Open databases through `provider` instead.
   pub fn provider<Q: ConnectionProvider>(self, provider: Q) -> Builder<Q> {
      Builder {
         config: self.config,
         provider,
      }
   }

   pub fn build(self) -> SqliteBridge<P> {
      SqliteBridge {
         registry: Arc::new(Registry::default()),
         provider: Arc::new(self.provider),
         config: self.config,
      }
   }
}

/// Named SQLite databases, each served by one session task.
///
/// Must be used from within a Tokio runtime. Dropping the bridge closes every
/// session once its queued work has run.
pub struct SqliteBridge<P: ConnectionProvider = SqlxConnectionProvider> {
   registry: Arc<Registry>,
   provider: Arc<P>,
   config: BridgeConfig,
}

impl<P: ConnectionProvider> SqliteBridge<P> {
   pub fn config(&self) -> &BridgeConfig {
      &self.config
   }

   /// Open the database `request.name`, starting its session.
   ///
   /// Opening a database that is already open (or still opening) succeeds
   /// with [`OpenOutcome::AlreadyOpen`] and changes nothing. Opening one that
   /// is closing waits for the close to finish and then starts a new session.
   pub async fn open(&self, request: OpenRequest) -> Result<OpenOutcome> {
      let name = request.name.as_str();
      let lock_workaround = request
         .lock_workaround
         .unwrap_or(self.config.lock_workaround);

      loop {
         let mut started = None;
         let (handle, created) = self.registry.get_or_insert_with(name, || {
            let plan = storage::plan_open(
               &self.config,
               name,
               request.asset_source.as_deref(),
               request.read_only,
            );
            let (session, handle) = Session::new(
               name,
               plan,
               lock_workaround,
               Arc::clone(&self.provider),
               Arc::downgrade(&self.registry),
            );
            started = Some(session);
            handle
         });

         if let (true, Some(session)) = (created, started) {
            let (opened_tx, opened_rx) = oneshot::channel();
            tokio::spawn(session.run(opened_tx));
            Pending::new(name, opened_rx).await?;
            return Ok(OpenOutcome::Opened);
         }

         match handle.wait_for(|s| s != SessionState::Opening).await {
            SessionState::Active => {
               debug!("Database {} already open", name);
               return Ok(OpenOutcome::AlreadyOpen);
            }
            // Closing or failed to open: wait for it to go away, then start over
            _ => {
               handle.wait_closed().await;
               self.registry.remove(name, handle.id());
            }
         }
      }
   }

   /// Close the database, after everything already queued for it has run.
   ///
   /// Closing a database that isn't open succeeds.
   pub async fn close(&self, name: &str) -> Result<()> {
      let (reply, rx) = oneshot::channel();
      match self.registry.enqueue(name, Command::Close { delete: false, reply }) {
         Ok(()) => Pending::new(name, rx).await,
         Err(Error::DatabaseNotOpen(_)) => {
            self.wait_closed(name).await;
            Ok(())
         }
         Err(e) => Err(e),
      }
   }

   /// Close the database if it is open, then delete its files.
   pub async fn delete(&self, name: &str) -> Result<()> {
      let (reply, rx) = oneshot::channel();
      match self.registry.enqueue(name, Command::Close { delete: true, reply }) {
         Ok(()) => Pending::new(name, rx).await,
         Err(Error::DatabaseNotOpen(_)) => {
            self.wait_closed(name).await;
            self.delete_files(name).await
         }
         Err(e) => Err(e),
      }
   }

   async fn delete_files(&self, name: &str) -> Result<()> {
      let path = storage::database_path(&self.config, name);
      match self.provider.delete(&path).await {
         Ok(true) => {
            info!("Deleted {}", path.display());
            Ok(())
         }
         Ok(false) => Err(Error::DeleteFailed {
            name: name.to_string(),
            message: "no database file".to_string(),
         }),
         Err(e) => Err(Error::DeleteFailed {
            name: name.to_string(),
            message: e.message(),
         }),
      }
   }

   /// Wait for a draining session under `name`, if any, to finish.
   async fn wait_closed(&self, name: &str) {
      if let Some(handle) = self.registry.lookup(name) {
         handle.wait_closed().await;
      }
   }

   /// Queue a batch and return its reply without waiting for it to run.
   ///
   /// Fails immediately with [`Error::DatabaseNotOpen`] when the database
   /// isn't open or is closing. Batches submitted for the same database run
   /// in submission order.
   pub fn submit_batch(&self, request: BatchRequest) -> Result<Pending<Vec<BatchItem>>> {
      let (reply, rx) = oneshot::channel();
      self.registry.enqueue(
         &request.name,
         Command::Batch {
            statements: request.statements,
            reply,
         },
      )?;
      Ok(Pending::new(request.name, rx))
   }

   /// Run a batch and wait for its results, one [`BatchItem`] per statement.
   pub async fn execute_batch(&self, request: BatchRequest) -> Result<Vec<BatchItem>> {
      self.submit_batch(request)?.await
   }

   /// Attach the open database `other_name` to `name` as schema `alias`.
   pub async fn attach(&self, request: AttachRequest) -> Result<()> {
      if !is_identifier(&request.alias) {
         return Err(Error::InvalidAlias(request.alias));
      }

      let other = self
         .registry
         .lookup(&request.other_name)
         .filter(|handle| handle.state() == SessionState::Active)
         .ok_or_else(|| Error::DatabaseNotOpen(request.other_name.clone()))?;

      let path = other.path().to_string_lossy().replace('\'', "''");
      let sql = format!("ATTACH DATABASE '{}' AS {}", path, request.alias);

      let results = self
         .execute_batch(BatchRequest::new(
            request.name,
            vec![BatchStatement::new(sql, vec![], "attach")],
         ))
         .await?;

      match results.first().and_then(BatchItem::error_message) {
         Some(message) => Err(Error::AttachFailed {
            alias: request.alias,
            message: message.to_string(),
         }),
         None => Ok(()),
      }
   }

   /// Return `value` unchanged. Lets the host check the bridge is reachable.
   pub fn echo(&self, value: String) -> String {
      value
   }

   /// Close every open database without running work still queued for it.
   ///
   /// Batches waiting in a queue are rejected with
   /// [`Error::DatabaseNotOpen`]; a batch already running finishes first.
   pub async fn close_all(&self) {
      let sessions = self.registry.snapshot();
      info!("Closing {} sessions", sessions.len());

      futures::future::join_all(sessions.iter().map(|(name, handle)| async move {
         handle.signal_shutdown();
         let _ = handle.send(Command::Stop);
         handle.wait_closed().await;
         if self.registry.remove(name, handle.id()) {
            warn!("Session for {} ended without closing", name);
         }
      }))
      .await;
   }

   /// Whether `name` has a session that is open and accepting work
   pub fn is_open(&self, name: &str) -> bool {
      self
         .registry
         .lookup(name)
         .is_some_and(|handle| handle.state() == SessionState::Active)
   }

   /// Names of all databases with a session accepting work, sorted
   pub fn open_databases(&self) -> Vec<String> {
      self.registry.open_names()
   }
}

/// Whether `alias` matches `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(alias: &str) -> bool {
   let mut chars = alias.chars();
   match chars.next() {
      Some(first) if first.is_ascii_alphabetic() || first == '_' => {
         chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
      }
      _ => false,
   }
}
