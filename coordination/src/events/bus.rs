//! Event bus for turbo session coordination
//!
//! Provides pub/sub messaging using Tokio broadcast channels with
//! optional persistence to the session store's event log. Each message
//! carries the events of one committed write plus the resulting snapshot.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::TurboEvent;
use crate::state::{Session, SharedSessionStore};

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Error type for event bus operations
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Failed to persist events: {0}")]
    PersistFailed(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// One committed session change
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub snapshot: Arc<Session>,
    pub events: Vec<TurboEvent>,
}

impl SessionUpdate {
    pub fn new(snapshot: Session, events: Vec<TurboEvent>) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.snapshot.id
    }

    pub fn revision(&self) -> u64 {
        self.snapshot.revision
    }
}

/// Event bus with broadcast channels and optional persistence
pub struct EventBus {
    /// Broadcast sender for publishing updates
    sender: broadcast::Sender<SessionUpdate>,

    /// Optional session store for event persistence
    store: Option<SharedSessionStore>,
}

impl EventBus {
    /// Create a new event bus without persistence
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            store: None,
        }
    }

    /// Create an event bus that appends every published event to the store
    pub fn with_persistence(store: SharedSessionStore) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            store: Some(store),
        }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Whether published events are written to the store
    pub fn persists_events(&self) -> bool {
        self.store.is_some()
    }

    /// Publish a committed update to all subscribers
    pub async fn publish(&self, update: SessionUpdate) -> EventBusResult<()> {
        let session_id = update.session_id().to_string();
        let revision = update.revision();

        if let Some(store) = &self.store {
            if !update.events.is_empty() {
                if let Err(e) = store
                    .append_events(&session_id, revision, &update.events)
                    .await
                {
                    warn!(session_id = %session_id, revision, "Failed to persist events: {}", e);
                    return Err(EventBusError::PersistFailed(e.to_string()));
                }
                debug!(session_id = %session_id, revision, count = update.events.len(), "Events persisted");
            }
        }

        // Broadcast to subscribers (ignore if no receivers)
        match self.sender.send(update) {
            Ok(count) => {
                debug!(session_id = %session_id, revision, receivers = count, "Update published");
            }
            Err(_) => {
                debug!(session_id = %session_id, revision, "Update published (no receivers)");
            }
        }
        Ok(())
    }

    /// Subscribe to receive every update
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if the bus has any subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by session ID
    pub session_id: Option<String>,
    /// Only pass updates containing one of these event types
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a new empty filter (matches all updates)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by session ID
    pub fn session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Filter by event types
    pub fn types(mut self, event_types: Vec<&str>) -> Self {
        self.event_types = Some(event_types.into_iter().map(String::from).collect());
        self
    }

    /// Check if an update matches this filter
    pub fn matches(&self, update: &SessionUpdate) -> bool {
        if let Some(ref sid) = self.session_id {
            if update.session_id() != sid {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !update
                .events
                .iter()
                .any(|e| types.iter().any(|t| t == e.event_type()))
            {
                return false;
            }
        }

        true
    }
}

/// Filtered receiver that only yields matching updates
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<SessionUpdate>,
    filter: EventFilter,
}

impl FilteredReceiver {
    /// Create a new filtered receiver
    pub fn new(receiver: broadcast::Receiver<SessionUpdate>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching update
    pub async fn recv(&mut self) -> Result<SessionUpdate, broadcast::error::RecvError> {
        loop {
            let update = self.receiver.recv().await?;
            if self.filter.matches(&update) {
                return Ok(update);
            }
        }
    }
}

/// Extension trait for subscribing with filters
pub trait EventBusExt {
    /// Subscribe with a filter
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver;
}

impl EventBusExt for EventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}

impl EventBusExt for SharedEventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}
