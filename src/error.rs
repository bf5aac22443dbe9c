use std::path::PathBuf;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to callers of [`crate::SqliteBridge`].
///
/// Failures of individual statements inside a batch are never reported
/// through this type; they are recorded in that statement's
/// [`sqlite_batch::BatchItem`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// No session accepts work for this name (never opened, closing or closed).
   #[error("database not open: {0}")]
   DatabaseNotOpen(String),

   /// The provider could not open the database file.
   #[error("could not open database {name}: {}", .source.message())]
   OpenFailed {
      name: String,
      #[source]
      source: sqlx_sqlite_capability::Error,
   },

   /// The asset a database should be created from does not exist.
   #[error("asset not found: {}", .0.display())]
   AssetNotFound(PathBuf),

   /// Closing the native handle failed. The session is closed regardless.
   #[error("couldn't close database {name}: {message}")]
   CloseFailed { name: String, message: String },

   /// The database files could not be deleted, or there were none.
   #[error("couldn't delete database {name}: {message}")]
   DeleteFailed { name: String, message: String },

   /// The session ended without replying to a request.
   #[error("session terminated before replying: {0}")]
   SessionTerminated(String),

   /// Attach alias is not a plain SQL identifier.
   ///
   /// Aliases must match `[A-Za-z_][A-Za-z0-9_]*`.
   #[error("invalid attach alias '{0}': must match [A-Za-z_][A-Za-z0-9_]*")]
   InvalidAlias(String),

   /// The `ATTACH DATABASE` statement itself failed.
   #[error("couldn't attach database as {alias}: {message}")]
   AttachFailed { alias: String, message: String },

   /// A batch panicked while executing. The session keeps running.
   #[error("internal error: {0}")]
   Internal(String),

   /// Error from the database capability.
   #[error(transparent)]
   Capability(#[from] sqlx_sqlite_capability::Error),

   /// I/O error when preparing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for the host layer.
   pub fn error_code(&self) -> String {
      match self {
         Error::DatabaseNotOpen(_) => "DATABASE_NOT_OPEN".to_string(),
         Error::OpenFailed { .. } => "OPEN_FAILED".to_string(),
         Error::AssetNotFound(_) => "ASSET_NOT_FOUND".to_string(),
         Error::CloseFailed { .. } => "CLOSE_FAILED".to_string(),
         Error::DeleteFailed { .. } => "DELETE_FAILED".to_string(),
         Error::SessionTerminated(_) => "SESSION_TERMINATED".to_string(),
         Error::InvalidAlias(_) => "INVALID_ALIAS".to_string(),
         Error::AttachFailed { .. } => "ATTACH_FAILED".to_string(),
         Error::Internal(_) => "INTERNAL_ERROR".to_string(),
         Error::Capability(e) => e.error_code(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}

/// Serialized as `{ "code": ..., "message": ... }` for the host layer
impl Serialize for Error {
   fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
      let mut state = serializer.serialize_struct("Error", 2)?;
      state.serialize_field("code", &self.error_code())?;
      state.serialize_field("message", &self.to_string())?;
      state.end()
   }
}
