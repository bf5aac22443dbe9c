//! Where a database lives on disk and which asset, if any, it is created from

use std::path::{Path, PathBuf};

use sqlx_sqlite_capability::OpenMode;
use tracing::debug;

use crate::{BridgeConfig, Error, Result};

/// Resolved location and open mode of one session's database
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenPlan {
   /// File the session opens
   pub path: PathBuf,
   /// The database's own file under the database directory. Differs from
   /// `path` only when a files-dir asset is opened in place; deleting the
   /// database removes this one.
   pub storage_path: PathBuf,
   pub mode: OpenMode,
   /// Asset to copy to `path` if no database exists there yet
   pub copy_from: Option<PathBuf>,
}

/// Asset source marker for the bundled `www/<name>` asset
const BUNDLED_BY_NAME: &str = "1";

#[derive(Debug, PartialEq, Eq)]
enum Asset {
   Bundled(PathBuf),
   Files(PathBuf),
}

pub(crate) fn database_path(config: &BridgeConfig, name: &str) -> PathBuf {
   config.database_dir.join(name)
}

fn resolve_asset(config: &BridgeConfig, source: &str, name: &str) -> Asset {
   if source == BUNDLED_BY_NAME {
      return Asset::Bundled(config.asset_dir.join("www").join(name));
   }
   if let Some(rest) = source.strip_prefix('~') {
      return Asset::Bundled(config.asset_dir.join(rest.trim_start_matches('/')));
   }
   Asset::Files(config.files_dir.join(source.trim_start_matches('/')))
}

/// Decide the path and mode a session opens with.
///
/// Only an asset from the files directory can be opened read-only, and it is
/// then opened where it is instead of being copied. In every other case the
/// read-only flag is ignored.
pub(crate) fn plan_open(
   config: &BridgeConfig,
   name: &str,
   asset_source: Option<&str>,
   read_only: bool,
) -> OpenPlan {
   let storage_path = database_path(config, name);

   match asset_source.map(|source| resolve_asset(config, source, name)) {
      Some(Asset::Files(asset)) if read_only => OpenPlan {
         path: asset,
         storage_path,
         mode: OpenMode::ReadOnly,
         copy_from: None,
      },
      Some(Asset::Files(asset)) | Some(Asset::Bundled(asset)) => OpenPlan {
         path: storage_path.clone(),
         storage_path,
         mode: OpenMode::ReadWriteCreate,
         copy_from: Some(asset),
      },
      None => OpenPlan {
         path: storage_path.clone(),
         storage_path,
         mode: OpenMode::ReadWriteCreate,
         copy_from: None,
      },
   }
}

/// Create the database directory and copy the asset into place.
///
/// An existing database is never overwritten.
pub(crate) async fn prepare(plan: &OpenPlan) -> Result<()> {
   if plan.mode == OpenMode::ReadOnly {
      return Ok(());
   }

   if let Some(parent) = plan.path.parent() {
      tokio::fs::create_dir_all(parent).await?;
   }

   let Some(asset) = &plan.copy_from else {
      return Ok(());
   };

   if tokio::fs::try_exists(&plan.path).await? {
      debug!("Database {} exists, not copying asset", plan.path.display());
      return Ok(());
   }

   copy_asset(asset, &plan.path).await
}

async fn copy_asset(asset: &Path, destination: &Path) -> Result<()> {
   if !tokio::fs::try_exists(asset).await? {
      return Err(Error::AssetNotFound(asset.to_path_buf()));
   }

   let bytes = tokio::fs::copy(asset, destination).await?;
   debug!(
      "Copied asset {} to {} ({} bytes)",
      asset.display(),
      destination.display(),
      bytes
   );
   Ok(())
}
