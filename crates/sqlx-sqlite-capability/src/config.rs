//! Configuration for connections opened by the SQLx provider

use std::time::Duration;

use serde::Deserialize;

/// Configuration for connections opened by [`crate::SqlxConnectionProvider`]
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_capability::ConnectionConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = ConnectionConfig::default();
///
/// // Override just one field
/// let config = ConnectionConfig {
///     busy_timeout_ms: 10_000,
///     ..Default::default()
/// };
/// assert_eq!(config.busy_timeout(), Duration::from_secs(10));
/// ```
///
/// From the host, as JSON: `{ "busyTimeoutMs": 10000, "foreignKeys": true }`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
   /// How long, in milliseconds, SQLite waits on a locked database before returning `SQLITE_BUSY`
   ///
   /// Only matters when another process (or an attached database) holds a lock;
   /// sessions never contend with themselves.
   ///
   /// Default: 5000
   pub busy_timeout_ms: u64,

   /// Whether `PRAGMA foreign_keys` is enabled on every new connection
   ///
   /// Default: false (SQLite's own default)
   pub foreign_keys: bool,
}

impl Default for ConnectionConfig {
   fn default() -> Self {
      Self {
         busy_timeout_ms: 5_000,
         foreign_keys: false,
      }
   }
}

impl ConnectionConfig {
   pub fn busy_timeout(&self) -> Duration {
      Duration::from_millis(self.busy_timeout_ms)
   }
}
