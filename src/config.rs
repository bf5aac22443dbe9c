//! Configuration for the bridge service

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Where the bridge keeps databases and looks for assets
///
/// # Examples
///
/// ```
/// use sqlite_session_bridge::BridgeConfig;
///
/// // Everything under one application directory
/// let config = BridgeConfig::with_base_dir("/var/lib/app");
///
/// // Override just one field
/// let config = BridgeConfig {
///     lock_workaround: true,
///     ..BridgeConfig::with_base_dir("/var/lib/app")
/// };
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
   /// Directory holding database files; a database named `name` lives at
   /// `database_dir/name`
   ///
   /// Default: `databases`
   pub database_dir: PathBuf,

   /// Root of the bundled, read-only assets that databases may be created from
   ///
   /// Default: `assets`
   pub asset_dir: PathBuf,

   /// Root of the application's own files, used for asset sources that are
   /// neither `1` nor `~`-prefixed
   ///
   /// Default: `files`
   pub files_dir: PathBuf,

   /// Close and reopen the handle after a batch that is exactly one `COMMIT`
   ///
   /// Applies to sessions whose open request doesn't say otherwise.
   ///
   /// Default: false
   pub lock_workaround: bool,
}

impl BridgeConfig {
   /// Place the database, asset and files directories under `base`.
   pub fn with_base_dir(base: impl AsRef<Path>) -> Self {
      let base = base.as_ref();
      Self {
         database_dir: base.join("databases"),
         asset_dir: base.join("assets"),
         files_dir: base.join("files"),
         lock_workaround: false,
      }
   }
}

impl Default for BridgeConfig {
   fn default() -> Self {
      Self {
         database_dir: PathBuf::from("databases"),
         asset_dir: PathBuf::from("assets"),
         files_dir: PathBuf::from("files"),
         lock_workaround: false,
      }
   }
}
