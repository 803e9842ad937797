//! Session persistence for turbo-mode coordination
//!
//! This module provides the session document types and the store contract
//! every coordinator write goes through:
//! - Session documents with members, sprint, top-2, deathmatch and result
//! - Swipe records keyed by (session, participant, activity)
//! - The per-session event log for replay and debugging
//!
//! # Architecture
//!
//! [`SessionStore`] is the gateway. Two implementations are provided:
//!
//! - `MemoryStore`: in-process tables, the default
//! - `RocksStore` (feature `heavy-state`): RocksDB column families
//!   `sessions`, `swipes` and `events`
//!
//! # Usage
//!
//! ```ignore
//! use turbo_coordination::state::{MemoryStore, Session, SessionStore};
//!
//! let store = MemoryStore::new().shared();
//! let session = Session::new(4, chrono::Utc::now());
//! store.insert_session(&session).await?;
//!
//! let mut next = session.clone();
//! next.revision += 1;
//! store.compare_and_swap(&next, session.revision).await?;
//! ```

pub mod memory;
#[cfg(feature = "heavy-state")]
pub mod rocks;
pub mod schema;
pub mod store;
pub mod types;

pub use memory::MemoryStore;
#[cfg(feature = "heavy-state")]
pub use rocks::RocksStore;
pub use store::{SessionStore, SharedSessionStore, StoreError, StoreResult};
pub use types::{
    ActivityId, CandidateSummary, Choice, DeathmatchInfo, DecidedBy, Member, ParticipantId,
    Session, SessionId, SessionOutcome, SprintInfo, SwipeDecision, SwipeRecord, TurboState,
};
