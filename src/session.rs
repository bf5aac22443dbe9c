//! Session actor: one task per open database, sole owner of its handle
//!
//! Each session drains an unbounded FIFO queue of [`Command`]s and runs them
//! one at a time against its private [`Database`]. Requests for the same
//! database are therefore serialized in arrival order while sessions for
//! different databases run in parallel.
//!
//! ## Lifecycle
//!
//! ```text
//! Opening ──open ok──> Active ──Close / Stop / shutdown──> Draining ──> Closed
//!    │                                                                   ^
//!    └──────────────────────────open failed──────────────────────────────┘
//! ```
//!
//! `Draining` and `Closed` are published under the registry write lock, so
//! once a session starts draining no new command can reach its queue.
//! Commands that were already queued behind the close are rejected with
//! [`Error::DatabaseNotOpen`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::FutureExt;
use sqlite_batch::{BatchItem, BatchStatement, execute_batch, is_lone_commit};
use sqlx_sqlite_capability::{ConnectionProvider, Database};
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::registry::Registry;
use crate::storage::{self, OpenPlan};
use crate::{Error, Result};

/// Work placed on a session's queue
pub(crate) enum Command {
   Batch {
      statements: Vec<BatchStatement>,
      reply: oneshot::Sender<Result<Vec<BatchItem>>>,
   },
   Close {
      delete: bool,
      reply: oneshot::Sender<Result<()>>,
   },
   /// Terminal signal from `close_all`
   Stop,
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
   Opening,
   Active,
   Draining,
   Closed,
}

impl SessionState {
   pub(crate) fn accepts_commands(self) -> bool {
      matches!(self, SessionState::Opening | SessionState::Active)
   }
}

/// Shared, cloneable view of a running session
#[derive(Clone)]
pub(crate) struct SessionHandle {
   id: Uuid,
   plan: Arc<OpenPlan>,
   commands: mpsc::UnboundedSender<Command>,
   state: watch::Receiver<SessionState>,
   shutdown: Arc<Notify>,
}

impl SessionHandle {
   pub fn id(&self) -> Uuid {
      self.id
   }

   /// Path of the database file this session has open
   pub fn path(&self) -> &std::path::Path {
      &self.plan.path
   }

   pub fn state(&self) -> SessionState {
      *self.state.borrow()
   }

   /// Send without the registry's state check. Only `close_all` and the
   /// registry itself use this.
   pub fn send(&self, command: Command) -> std::result::Result<(), Command> {
      self.commands.send(command).map_err(|e| e.0)
   }

   /// Ask the session to stop before running anything else it has queued.
   pub fn signal_shutdown(&self) {
      self.shutdown.notify_one();
   }

   /// Wait until the session's state satisfies `done`.
   ///
   /// A session whose task is gone counts as `Closed`.
   pub async fn wait_for(&self, mut done: impl FnMut(SessionState) -> bool) -> SessionState {
      let mut state = self.state.clone();
      match state.wait_for(|s| done(*s)).await {
         Ok(s) => *s,
         Err(_) => SessionState::Closed,
      }
   }

   pub async fn wait_closed(&self) {
      self.wait_for(|s| s == SessionState::Closed).await;
   }
}

/// Reply to a queued request.
///
/// Resolves with the session's answer, or [`Error::SessionTerminated`] if the
/// session went away without answering.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Pending<T> {
   name: String,
   reply: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
   pub(crate) fn new(name: impl Into<String>, reply: oneshot::Receiver<Result<T>>) -> Self {
      Self {
         name: name.into(),
         reply,
      }
   }
}

impl<T> Future for Pending<T> {
   type Output = Result<T>;

   fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
      match Pin::new(&mut self.reply).poll(cx) {
         Poll::Ready(Ok(result)) => Poll::Ready(result),
         Poll::Ready(Err(_)) => Poll::Ready(Err(Error::SessionTerminated(self.name.clone()))),
         Poll::Pending => Poll::Pending,
      }
   }
}

/// Everything a session task owns
pub(crate) struct Session<P: ConnectionProvider> {
   name: String,
   id: Uuid,
   plan: Arc<OpenPlan>,
   lock_workaround: bool,
   provider: Arc<P>,
   registry: Weak<Registry>,
   commands: mpsc::UnboundedReceiver<Command>,
   state: watch::Sender<SessionState>,
   shutdown: Arc<Notify>,
}

/// Why the serve loop ended
enum Exit {
   Close {
      delete: bool,
      reply: oneshot::Sender<Result<()>>,
   },
   Stop,
   Shutdown,
   Disconnected,
   ReopenFailed,
}

impl<P: ConnectionProvider> Session<P> {
   /// Create a session in `Opening` state and the handle the registry keeps.
   pub fn new(
      name: &str,
      plan: OpenPlan,
      lock_workaround: bool,
      provider: Arc<P>,
      registry: Weak<Registry>,
   ) -> (Self, SessionHandle) {
      let (commands_tx, commands_rx) = mpsc::unbounded_channel();
      let (state_tx, state_rx) = watch::channel(SessionState::Opening);
      let shutdown = Arc::new(Notify::new());
      let id = Uuid::new_v4();
      let plan = Arc::new(plan);

      let handle = SessionHandle {
         id,
         plan: Arc::clone(&plan),
         commands: commands_tx,
         state: state_rx,
         shutdown: Arc::clone(&shutdown),
      };

      let session = Self {
         name: name.to_string(),
         id,
         plan,
         lock_workaround,
         provider,
         registry,
         commands: commands_rx,
         state: state_tx,
         shutdown,
      };

      (session, handle)
   }

   /// Run the session to completion, reporting the open result on `opened`.
   pub async fn run(self, opened: oneshot::Sender<Result<()>>) {
      let span = info_span!("session", db = %self.name, id = %self.id);
      self.run_inner(opened).instrument(span).await
   }

   async fn run_inner(mut self, opened: oneshot::Sender<Result<()>>) {
      let db = match self.open().await {
         Ok(db) => db,
         Err(e) => {
            warn!("Failed to open {}: {}", self.plan.path.display(), e);
            self.transition(SessionState::Closed);
            self.reject_queued().await;
            let _ = opened.send(Err(e));
            return;
         }
      };

      self.transition(SessionState::Active);
      info!("Opened {} ({:?})", self.plan.path.display(), self.plan.mode);
      let _ = opened.send(Ok(()));

      let (db, exit) = self.serve(db).await;
      self.finish(db, exit).await;
   }

   async fn open(&self) -> Result<P::Database> {
      storage::prepare(&self.plan).await?;
      self
         .provider
         .open(&self.plan.path, self.plan.mode)
         .await
         .map_err(|source| Error::OpenFailed {
            name: self.name.clone(),
            source,
         })
   }

   async fn serve(&mut self, mut db: P::Database) -> (Option<P::Database>, Exit) {
      loop {
         let command = tokio::select! {
            biased;
            _ = self.shutdown.notified() => return (Some(db), Exit::Shutdown),
            command = self.commands.recv() => command,
         };

         let (statements, reply) = match command {
            Some(Command::Batch { statements, reply }) => (statements, reply),
            Some(Command::Close { delete, reply }) => {
               return (Some(db), Exit::Close { delete, reply });
            }
            Some(Command::Stop) => return (Some(db), Exit::Stop),
            None => return (Some(db), Exit::Disconnected),
         };

         let reopen = self.lock_workaround && is_lone_commit(&statements);
         debug!("Running batch of {} statements", statements.len());

         let result = AssertUnwindSafe(execute_batch(&mut db, statements))
            .catch_unwind()
            .await
            .map_err(|panic| {
               let message = panic_message(&*panic);
               error!("Batch panicked: {}", message);
               Error::Internal(message)
            });
         let _ = reply.send(result);

         if reopen {
            db = match self.reopen(db).await {
               Ok(db) => db,
               Err(e) => {
                  error!("Failed to reopen after COMMIT: {}", e);
                  return (None, Exit::ReopenFailed);
               }
            };
         }
      }
   }

   /// Close the handle and open a fresh one on the same file
   async fn reopen(&self, db: P::Database) -> Result<P::Database> {
      debug!("Reopening {} after COMMIT", self.plan.path.display());
      if let Err(e) = db.close().await {
         warn!("Close before reopen failed: {}", e);
      }
      Ok(self.provider.open(&self.plan.path, self.plan.mode).await?)
   }

   async fn finish(&mut self, db: Option<P::Database>, exit: Exit) {
      self.transition(SessionState::Draining);

      let closed = match db {
         Some(db) => db.close().await.map_err(|e| Error::CloseFailed {
            name: self.name.clone(),
            message: e.message(),
         }),
         None => Ok(()),
      };
      if let Err(e) = &closed {
         warn!("{}", e);
      }

      let (reply, result) = match exit {
         Exit::Close { delete: true, reply } => (Some(reply), self.delete_files().await),
         Exit::Close { delete: false, reply } => (Some(reply), closed),
         Exit::Stop | Exit::Shutdown | Exit::Disconnected | Exit::ReopenFailed => (None, closed),
      };

      self.transition(SessionState::Closed);
      info!("Closed {}", self.plan.path.display());
      self.reject_queued().await;

      if let Some(reply) = reply {
         let _ = reply.send(result);
      }
   }

   /// Delete the database's own files. A files-dir asset opened in place is
   /// left alone.
   async fn delete_files(&self) -> Result<()> {
      let path = &self.plan.storage_path;
      match self.provider.delete(path).await {
         Ok(true) => {
            debug!("Deleted {}", path.display());
            Ok(())
         }
         Ok(false) => Err(Error::DeleteFailed {
            name: self.name.clone(),
            message: "no database file".to_string(),
         }),
         Err(e) => Err(Error::DeleteFailed {
            name: self.name.clone(),
            message: e.message(),
         }),
      }
   }

   /// Answer everything left in the queue. Must only run once the session is
   /// `Closed`, when nothing new can be enqueued.
   async fn reject_queued(&mut self) {
      self.commands.close();

      while let Ok(command) = self.commands.try_recv() {
         match command {
            Command::Batch { reply, .. } => {
               let _ = reply.send(Err(Error::DatabaseNotOpen(self.name.clone())));
            }
            Command::Close { delete: false, reply } => {
               let _ = reply.send(Ok(()));
            }
            Command::Close { delete: true, reply } => {
               let _ = reply.send(self.delete_files().await);
            }
            Command::Stop => {}
         }
      }
   }

   fn transition(&self, next: SessionState) {
      match self.registry.upgrade() {
         Some(registry) => registry.transition(&self.name, self.id, &self.state, next),
         None => {
            self.state.send_replace(next);
         }
      }
   }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
   if let Some(message) = panic.downcast_ref::<&str>() {
      return message.to_string();
   }
   if let Some(message) = panic.downcast_ref::<String>() {
      return message.clone();
   }
   "batch execution panicked".to_string()
}

/// A handle whose task never runs, for registry tests
#[cfg(test)]
pub(crate) fn detached_handle(
   name: &str,
) -> (
   SessionHandle,
   watch::Sender<SessionState>,
   mpsc::UnboundedReceiver<Command>,
) {
   let (commands_tx, commands_rx) = mpsc::unbounded_channel();
   let (state_tx, state_rx) = watch::channel(SessionState::Opening);
   let handle = SessionHandle {
      id: Uuid::new_v4(),
      plan: Arc::new(OpenPlan {
         path: std::path::PathBuf::from(name),
         storage_path: std::path::PathBuf::from(name),
         mode: sqlx_sqlite_capability::OpenMode::ReadWriteCreate,
         copy_from: None,
      }),
      commands: commands_tx,
      state: state_rx,
      shutdown: Arc::new(Notify::new()),
   };
   (handle, state_tx, commands_rx)
}
