//! Session store contract
//!
//! The store is the only shared mutable resource. Every write to a session
//! document is a compare-and-swap on its `revision`, which gives phase
//! transitions at-most-once semantics no matter how many callers race.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Session, SwipeRecord};
use crate::events::TurboEvent;

/// Error type for session store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "heavy-state")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Revision conflict on {session_id}: expected {expected}, found {found}")]
    Conflict {
        session_id: String,
        expected: u64,
        found: u64,
    },

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

impl StoreError {
    /// Whether the write lost a revision race and may be retried on a fresh read
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Persistence gateway for turbo sessions
///
/// Writers pass the revision they read as `expected_revision` and a session
/// whose `revision` is the next value. Implementations must reject the write
/// with [`StoreError::Conflict`] when the stored revision has moved on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a brand-new session; fails if the ID is taken
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;

    /// Load the current snapshot of a session
    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Session>>;

    /// Replace a session if its stored revision still equals `expected_revision`
    async fn compare_and_swap(&self, session: &Session, expected_revision: u64)
        -> StoreResult<()>;

    /// Upsert a swipe and replace the session in one atomic write
    async fn commit_swipe(
        &self,
        session: &Session,
        expected_revision: u64,
        swipe: &SwipeRecord,
    ) -> StoreResult<()>;

    /// Look up a single swipe by its key
    async fn get_swipe(
        &self,
        session_id: &str,
        participant_id: &str,
        activity_id: &str,
    ) -> StoreResult<Option<SwipeRecord>>;

    /// All current swipe records in a session
    async fn list_swipes(&self, session_id: &str) -> StoreResult<Vec<SwipeRecord>>;

    /// Append the events produced by one committed revision
    async fn append_events(
        &self,
        session_id: &str,
        revision: u64,
        events: &[TurboEvent],
    ) -> StoreResult<()>;

    /// The session's event log in commit order
    async fn session_events(&self, session_id: &str) -> StoreResult<Vec<TurboEvent>>;
}
