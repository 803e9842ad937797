//! In-process session store
//!
//! Default store for single-node deployments and tests. All data lives behind
//! one lock, so a swipe upsert and its session write land together.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::schema::keys;
use super::store::{SessionStore, SharedSessionStore, StoreError, StoreResult};
use super::types::{Session, SwipeRecord};
use crate::events::TurboEvent;

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, Session>,
    swipes: BTreeMap<String, SwipeRecord>,
    events: HashMap<String, Vec<TurboEvent>>,
}

impl Tables {
    fn check_revision(&self, session: &Session, expected_revision: u64) -> StoreResult<()> {
        let stored = self
            .sessions
            .get(&session.id)
            .ok_or_else(|| StoreError::NotFound(keys::session(&session.id)))?;
        if stored.revision != expected_revision {
            return Err(StoreError::Conflict {
                session_id: session.id.clone(),
                expected: expected_revision,
                found: stored.revision,
            });
        }
        Ok(())
    }
}

/// Session store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedSessionStore {
        Arc::new(self)
    }

    /// Number of stored sessions
    pub fn session_count(&self) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.sessions.len())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.sessions.contains_key(&session.id) {
            return Err(StoreError::AlreadyExists(keys::session(&session.id)));
        }
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.sessions.get(session_id).cloned())
    }

    async fn compare_and_swap(
        &self,
        session: &Session,
        expected_revision: u64,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.check_revision(session, expected_revision)?;
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn commit_swipe(
        &self,
        session: &Session,
        expected_revision: u64,
        swipe: &SwipeRecord,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.check_revision(session, expected_revision)?;
        let key = keys::swipe(&swipe.session_id, &swipe.participant_id, &swipe.activity_id);
        tables.swipes.insert(key, swipe.clone());
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_swipe(
        &self,
        session_id: &str,
        participant_id: &str,
        activity_id: &str,
    ) -> StoreResult<Option<SwipeRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let key = keys::swipe(session_id, participant_id, activity_id);
        Ok(tables.swipes.get(&key).cloned())
    }

    async fn list_swipes(&self, session_id: &str) -> StoreResult<Vec<SwipeRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let prefix = keys::swipe_prefix(session_id);
        Ok(tables
            .swipes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, swipe)| swipe.clone())
            .collect())
    }

    async fn append_events(
        &self,
        session_id: &str,
        _revision: u64,
        events: &[TurboEvent],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables
            .events
            .entry(session_id.to_string())
            .or_default()
            .extend(events.iter().cloned());
        Ok(())
    }

    async fn session_events(&self, session_id: &str) -> StoreResult<Vec<TurboEvent>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.events.get(session_id).cloned().unwrap_or_default())
    }
}
