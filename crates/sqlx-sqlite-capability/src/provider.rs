//! Factories that produce [`Database`] handles

use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::{debug, trace};

use crate::{ConnectionConfig, Database, Result, SqlxDatabase};

/// How a database file is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenMode {
   /// Read-write, creating the file if it does not exist
   #[default]
   ReadWriteCreate,
   /// Read-only; the file must already exist
   ReadOnly,
}

/// Opens database handles for a concrete engine.
///
/// The provider is chosen once, when the owning service is built, and every
/// session opened afterwards goes through it. Swapping engines means swapping
/// the provider type, nothing else.
pub trait ConnectionProvider: Send + Sync + 'static {
   type Database: Database;

   /// Open the database file at `path`.
   fn open(
      &self,
      path: &Path,
      mode: OpenMode,
   ) -> impl Future<Output = Result<Self::Database>> + Send;

   /// Delete the database file at `path` along with its journal files.
   ///
   /// Returns `false` when there was no database file to delete.
   fn delete(&self, path: &Path) -> impl Future<Output = Result<bool>> + Send {
      remove_database_files(path)
   }
}

/// Default provider opening one [`SqlxDatabase`] per call
#[derive(Debug, Clone, Default)]
pub struct SqlxConnectionProvider {
   config: ConnectionConfig,
}

impl SqlxConnectionProvider {
   pub fn new(config: ConnectionConfig) -> Self {
      Self { config }
   }
}

impl ConnectionProvider for SqlxConnectionProvider {
   type Database = SqlxDatabase;

   async fn open(&self, path: &Path, mode: OpenMode) -> Result<SqlxDatabase> {
      let options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(mode == OpenMode::ReadWriteCreate)
         .read_only(mode == OpenMode::ReadOnly)
         .busy_timeout(self.config.busy_timeout())
         .foreign_keys(self.config.foreign_keys);

      debug!("Opening sqlite db: {} ({:?})", path.display(), mode);
      let conn = options.connect().await?;

      Ok(SqlxDatabase::new(conn, path.to_path_buf()))
   }
}

/// Suffixes of the files SQLite may keep next to a database
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
   let mut name = OsString::from(path.as_os_str());
   name.push(suffix);
   PathBuf::from(name)
}

/// Remove a database file and any journal/WAL/shared-memory files beside it.
///
/// Returns whether the main database file existed and was removed. Missing
/// sidecar files are not an error.
pub async fn remove_database_files(path: &Path) -> Result<bool> {
   let removed = match tokio::fs::remove_file(path).await {
      Ok(()) => true,
      Err(e) if e.kind() == ErrorKind::NotFound => false,
      Err(e) => return Err(e.into()),
   };

   for suffix in SIDECAR_SUFFIXES {
      let sidecar = sidecar_path(path, suffix);
      match tokio::fs::remove_file(&sidecar).await {
         Ok(()) => trace!("Removed {}", sidecar.display()),
         Err(e) if e.kind() == ErrorKind::NotFound => {}
         Err(e) => return Err(e.into()),
      }
   }

   Ok(removed)
}
