//! Event-driven coordination for turbo sessions
//!
//! This module provides the pub/sub infrastructure that pushes every
//! committed snapshot to subscribed clients and records an event log.
//!
//! # Architecture
//!
//! 1. **Event Types** (`types.rs`): what happened in a committed write,
//!    from session creation to the final result.
//!
//! 2. **Event Bus** (`bus.rs`): Tokio broadcast-based pub/sub carrying
//!    the events together with the new snapshot, with optional
//!    persistence to the session store.
//!
//! 3. **Event History** (`history.rs`): reads a session's log back.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │Session actor │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (commit)    │     │  (broadcast) │     │  (snapshots) │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐
//!                      │ SessionStore │
//!                      │ (event log)  │
//!                      └──────────────┘
//! ```

pub mod bus;
pub mod history;
pub mod types;

pub use bus::{
    EventBus, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver,
    SessionUpdate, SharedEventBus,
};
pub use history::{EventHistory, HistoryError, HistoryResult};
pub use types::{EventId, TurboEvent};
