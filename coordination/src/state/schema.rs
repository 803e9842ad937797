//! Column family definitions for the RocksDB session store
//!
//! Each column family provides logical separation of data types
//! while sharing the same RocksDB instance.

/// Column family for session documents
pub const CF_SESSIONS: &str = "sessions";

/// Column family for swipe records
pub const CF_SWIPES: &str = "swipes";

/// Column family for the per-session event log
pub const CF_EVENTS: &str = "events";

/// All column family names
pub const ALL_CFS: &[&str] = &[CF_SESSIONS, CF_SWIPES, CF_EVENTS];

/// Key prefixes for compound keys
///
/// Ids are caller-supplied and may contain `:`, so every variable component
/// except the last is written as `<byte length>:<id>`.
pub mod keys {
    /// Create a session key
    pub fn session(session_id: &str) -> String {
        format!("sess:{}", session_id)
    }

    /// Create a swipe key (session + participant + activity)
    pub fn swipe(session_id: &str, participant_id: &str, activity_id: &str) -> String {
        format!(
            "{}{}:{}:{}",
            swipe_prefix(session_id),
            participant_id.len(),
            participant_id,
            activity_id
        )
    }

    /// Prefix covering every swipe in a session
    pub fn swipe_prefix(session_id: &str) -> String {
        format!("swipe:{}:{}:", session_id.len(), session_id)
    }

    /// Create an event key, ordered by commit revision then position in the commit
    pub fn event(session_id: &str, revision: u64, index: usize) -> String {
        format!("{}{:020}:{:04}", event_prefix(session_id), revision, index)
    }

    /// Prefix covering every event in a session
    pub fn event_prefix(session_id: &str) -> String {
        format!("evt:{}:{}:", session_id.len(), session_id)
    }
}
