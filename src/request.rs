//! Request and response types exchanged with the host layer

use serde::{Deserialize, Serialize};
use sqlite_batch::BatchStatement;

/// Open (or create) a database session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
   pub name: String,

   /// Asset to create the database from when it doesn't exist yet.
   ///
   /// `"1"` names the bundled `www/<name>` asset, `"~path"` a bundled asset at
   /// `path`, and anything else a file under the application's files directory.
   #[serde(default)]
   pub asset_source: Option<String>,

   /// Open a files-directory asset in place, read-only, instead of copying it
   #[serde(default)]
   pub read_only: bool,

   /// Overrides [`crate::BridgeConfig::lock_workaround`] for this session
   #[serde(default)]
   pub lock_workaround: Option<bool>,
}

impl OpenRequest {
   pub fn new(name: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         asset_source: None,
         read_only: false,
         lock_workaround: None,
      }
   }

   pub fn asset_source(mut self, source: impl Into<String>) -> Self {
      self.asset_source = Some(source.into());
      self
   }

   pub fn read_only(mut self, read_only: bool) -> Self {
      self.read_only = read_only;
      self
   }

   pub fn lock_workaround(mut self, enabled: bool) -> Self {
      self.lock_workaround = Some(enabled);
      self
   }
}

/// Result of a successful open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenOutcome {
   /// A new session was started
   Opened,
   /// A session for this name was already open; nothing changed
   AlreadyOpen,
}

/// Statements to run, in order, on one database
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
   pub name: String,
   pub statements: Vec<BatchStatement>,
}

impl BatchRequest {
   pub fn new(name: impl Into<String>, statements: Vec<BatchStatement>) -> Self {
      Self {
         name: name.into(),
         statements,
      }
   }
}

/// Attach the open database `other_name` to `name` under `alias`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
   pub name: String,
   pub other_name: String,
   pub alias: String,
}
