//! Name → session map shared by the bridge and its session tasks

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::trace;
use uuid::Uuid;

use crate::session::{Command, SessionHandle, SessionState};
use crate::{Error, Result};

/// Sessions by database name.
///
/// Every state change to `Draining` or `Closed` happens under the write lock,
/// and every enqueue checks the state and sends under the read lock. A command
/// therefore either reaches the queue before the session starts draining or
/// is rejected, never lost in between.
#[derive(Default)]
pub(crate) struct Registry {
   sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl Registry {
   /// Return the session for `name`, creating it with `make` if there is none.
   ///
   /// The flag is `true` when `make` was called.
   pub fn get_or_insert_with(
      &self,
      name: &str,
      make: impl FnOnce() -> SessionHandle,
   ) -> (SessionHandle, bool) {
      let mut sessions = self.sessions.write();
      match sessions.entry(name.to_string()) {
         Entry::Occupied(entry) => (entry.get().clone(), false),
         Entry::Vacant(entry) => {
            let handle = make();
            trace!("Registered session {} for {}", handle.id(), name);
            (entry.insert(handle).clone(), true)
         }
      }
   }

   pub fn lookup(&self, name: &str) -> Option<SessionHandle> {
      self.sessions.read().get(name).cloned()
   }

   /// Queue `command` on the session for `name` if it still accepts work.
   pub fn enqueue(&self, name: &str, command: Command) -> Result<()> {
      let sessions = self.sessions.read();
      let handle = sessions
         .get(name)
         .filter(|handle| handle.state().accepts_commands())
         .ok_or_else(|| Error::DatabaseNotOpen(name.to_string()))?;

      handle
         .send(command)
         .map_err(|_| Error::DatabaseNotOpen(name.to_string()))
   }

   /// Publish a session's new state.
   ///
   /// Entering `Closed` also removes the entry, but only while it still
   /// belongs to session `id`; a newer session under the same name is left
   /// alone.
   pub fn transition(
      &self,
      name: &str,
      id: Uuid,
      state: &watch::Sender<SessionState>,
      next: SessionState,
   ) {
      let mut sessions = self.sessions.write();
      state.send_replace(next);

      if next == SessionState::Closed
         && let Entry::Occupied(entry) = sessions.entry(name.to_string())
         && entry.get().id() == id
      {
         entry.remove();
         trace!("Removed session {} for {}", id, name);
      }
   }

   /// Remove the entry for `name` if it still belongs to session `id`.
   ///
   /// Only needed for a session whose task ended without reaching `Closed`.
   pub fn remove(&self, name: &str, id: Uuid) -> bool {
      let mut sessions = self.sessions.write();
      match sessions.entry(name.to_string()) {
         Entry::Occupied(entry) if entry.get().id() == id => {
            entry.remove();
            true
         }
         _ => false,
      }
   }

   pub fn snapshot(&self) -> Vec<(String, SessionHandle)> {
      self
         .sessions
         .read()
         .iter()
         .map(|(name, handle)| (name.clone(), handle.clone()))
         .collect()
   }

   /// Names of sessions that accept work, sorted
   pub fn open_names(&self) -> Vec<String> {
      let mut names: Vec<String> = self
         .sessions
         .read()
         .iter()
         .filter(|(_, handle)| handle.state().accepts_commands())
         .map(|(name, _)| name.clone())
         .collect();
      names.sort();
      names
   }

   #[cfg(test)]
   pub fn is_empty(&self) -> bool {
      self.sessions.read().is_empty()
   }
}
