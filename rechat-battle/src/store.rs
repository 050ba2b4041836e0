//! In-memory session store
//!
//! Sessions are keyed by chain battle id, with key 0 reserved for a
//! challenger still waiting on id assignment. Each session sits behind
//! its own lock so operations on different battles never serialize; the
//! outer map lock is held only for map shape changes and handle lookup.
//!
//! Locking rule for callers: never hold a session's inner lock across a
//! collaborator await. `rebind` takes the inner lock while holding the
//! map lock, so a session guard parked on a slow await would stall every
//! store operation behind it.

use crate::session::{BattleSession, SessionSnapshot};
use rechat_common::error::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to one session's state
pub type SessionHandle = Arc<RwLock<BattleSession>>;

/// Concurrency-safe map of live battle sessions
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<u64, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session under its battle id
    ///
    /// Occupied keys are an error: sessions are removed explicitly,
    /// never silently replaced.
    pub async fn insert(&self, session: BattleSession) -> Result<SessionHandle> {
        let battle_id = session.battle_id;
        let mut sessions = self.sessions.write().await;
        match sessions.entry(battle_id) {
            Entry::Occupied(_) => Err(Error::IllegalState {
                battle_id,
                reason: String::from("a session already holds this battle id"),
            }),
            Entry::Vacant(slot) => {
                let handle = Arc::new(RwLock::new(session));
                slot.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Handle for the session under `battle_id`, if present
    pub async fn get(&self, battle_id: u64) -> Option<SessionHandle> {
        self.sessions.read().await.get(&battle_id).cloned()
    }

    /// Read view of the session under `battle_id`, if present
    pub async fn snapshot(&self, battle_id: u64) -> Option<SessionSnapshot> {
        let handle = self.get(battle_id).await?;
        let session = handle.read().await;
        Some(session.snapshot())
    }

    /// Move a session to a newly assigned battle id
    ///
    /// Rekeys the map entry and updates the session's own `battle_id` in
    /// one atomic step, so no reader ever sees the session under the new
    /// key with the old id inside.
    pub async fn rebind(&self, old_id: u64, new_id: u64) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&new_id) {
            return Err(Error::IllegalState {
                battle_id: new_id,
                reason: String::from("a session already holds this battle id"),
            });
        }
        let handle = sessions.remove(&old_id).ok_or(Error::NotFound(old_id))?;
        handle.write().await.battle_id = new_id;
        sessions.insert(new_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Remove and return the session under `battle_id`
    pub async fn remove(&self, battle_id: u64) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&battle_id)
    }

    /// Snapshots of every non-terminal session, oldest first
    pub async fn active_snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let mut snapshots = Vec::with_capacity(sessions.len());
        for handle in sessions.values() {
            let session = handle.read().await;
            if !session.status().is_terminal() {
                snapshots.push(session.snapshot());
            }
        }
        drop(sessions);

        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Number of stored sessions, terminal ones included
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
