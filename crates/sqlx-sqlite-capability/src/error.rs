//! Error types for sqlx-sqlite-capability

use thiserror::Error;

/// Errors that may occur when working with a database capability
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Commit or rollback requested while no transaction was started
   #[error("no transaction pending")]
   NoTransactionPending,

   /// A cell carried a storage class that has no [`crate::SqlValue`] mapping
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
   /// The engine's own message for database errors, the display text otherwise.
   ///
   /// `Sqlx` errors wrap database errors in two layers of prefixes; callers
   /// reporting a failed statement only want the part SQLite produced.
   pub fn message(&self) -> String {
      match self {
         Error::Sqlx(sqlx::Error::Database(db_err)) => db_err.message().to_string(),
         other => other.to_string(),
      }
   }

   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::NoTransactionPending => "NO_TRANSACTION_PENDING".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
      }
   }
}
