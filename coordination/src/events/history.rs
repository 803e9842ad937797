//! Event history
//!
//! Reads a session's event log back from the store for recovery
//! and debugging purposes.

use tracing::debug;

use super::types::TurboEvent;
use crate::state::SharedSessionStore;

/// Error type for history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Store error: {0}")]
    StoreError(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Event history reader
pub struct EventHistory {
    store: SharedSessionStore,
}

impl EventHistory {
    /// Create a new event history reader
    pub fn new(store: SharedSessionStore) -> Self {
        Self { store }
    }

    /// Get all events for a session in commit order
    pub async fn session_events(&self, session_id: &str) -> HistoryResult<Vec<TurboEvent>> {
        let events = self
            .store
            .session_events(session_id)
            .await
            .map_err(|e| HistoryError::StoreError(e.to_string()))?;

        debug!(session_id, count = events.len(), "Retrieved session history");
        Ok(events)
    }

    /// Get a session's events restricted to the given types
    pub async fn events_of_type(
        &self,
        session_id: &str,
        event_types: &[&str],
    ) -> HistoryResult<Vec<TurboEvent>> {
        let mut events = self.session_events(session_id).await?;
        events.retain(|e| event_types.contains(&e.event_type()));
        Ok(events)
    }
}
