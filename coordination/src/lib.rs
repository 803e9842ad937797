//! Turbo Session Coordinator Library
//!
//! This library provides:
//! - Session documents and the store contract they are committed through
//! - An event bus pushing every committed snapshot to subscribers
//! - The turbo-mode state machine: swipe tally, quorum benchmark and
//!   deathmatch runoff
//!
//! # Usage
//!
//! ```ignore
//! use turbo_coordination::{EventBus, MemoryStore, TurboConfig, TurboCoordinator};
//!
//! let coordinator = TurboCoordinator::new(
//!     MemoryStore::new().shared(),
//!     EventBus::new().shared(),
//!     TurboConfig::from_env(),
//! )
//! .shared();
//!
//! let session = coordinator.create_session(4, Some("host".into())).await?;
//! coordinator.join(&session.id, "alice").await?;
//! coordinator.start_briefing(&session.id).await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod events;
pub mod state;
pub mod turbo;

// Re-export key state types
pub use state::{
    CandidateSummary, Choice, DeathmatchInfo, DecidedBy, Member, MemoryStore, Session,
    SessionOutcome, SessionStore, SharedSessionStore, SprintInfo, StoreError, SwipeDecision,
    SwipeRecord, TurboState,
};

#[cfg(feature = "heavy-state")]
pub use state::RocksStore;

// Re-export key event types
pub use events::{EventBus, EventHistory, SessionUpdate, SharedEventBus, TurboEvent};

// Re-export coordinator types
pub use turbo::{
    BenchmarkReport, PhaseScheduler, SessionSubscription, SharedTurboCoordinator, SwipeOutcome,
    SwipeRequest, TurboConfig, TurboCoordinator, TurboError, TurboResult,
};
