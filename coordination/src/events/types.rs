//! Event types for turbo session coordination
//!
//! Every committed session change produces one or more events. They are
//! broadcast alongside the new snapshot and appended to the session's log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{ActivityId, Choice, DecidedBy, ParticipantId, SessionId, SwipeDecision, TurboState};

/// Unique identifier for events
pub type EventId = String;

/// All turbo coordination events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurboEvent {
    /// A new session was created in the lobby
    SessionCreated {
        session_id: SessionId,
        group_size: u32,
        created_by: Option<ParticipantId>,
        timestamp: DateTime<Utc>,
    },

    /// A participant joined
    MemberJoined {
        session_id: SessionId,
        participant_id: ParticipantId,
        timestamp: DateTime<Utc>,
    },

    /// The session moved to a new phase
    PhaseChanged {
        session_id: SessionId,
        from: TurboState,
        to: TurboState,
        timestamp: DateTime<Utc>,
    },

    /// A swipe was stored
    SwipeRecorded {
        session_id: SessionId,
        participant_id: ParticipantId,
        activity_id: ActivityId,
        decision: SwipeDecision,
        /// True when this replaced an earlier swipe on the same candidate
        overwrite: bool,
        swipe_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// The sprint quorum was first met
    BenchmarkHit {
        session_id: SessionId,
        counted_members: u32,
        total_swipes: u32,
        target: u32,
        timestamp: DateTime<Utc>,
    },

    /// A phase transition was due but could not be applied
    TransitionSkipped {
        session_id: SessionId,
        from: TurboState,
        candidates: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The top-2 runoff began
    DeathmatchStarted {
        session_id: SessionId,
        option_a: ActivityId,
        option_b: ActivityId,
        ends_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A deathmatch vote was cast or switched
    VoteCast {
        session_id: SessionId,
        participant_id: ParticipantId,
        choice: Choice,
        previous: Option<Choice>,
        votes_a: u32,
        votes_b: u32,
        timestamp: DateTime<Utc>,
    },

    /// The session reached its result
    SessionResolved {
        session_id: SessionId,
        winner: Choice,
        activity_id: Option<ActivityId>,
        decided_by: DecidedBy,
        votes_a: u32,
        votes_b: u32,
        timestamp: DateTime<Utc>,
    },
}

impl TurboEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TurboEvent::SessionCreated { timestamp, .. } => *timestamp,
            TurboEvent::MemberJoined { timestamp, .. } => *timestamp,
            TurboEvent::PhaseChanged { timestamp, .. } => *timestamp,
            TurboEvent::SwipeRecorded { timestamp, .. } => *timestamp,
            TurboEvent::BenchmarkHit { timestamp, .. } => *timestamp,
            TurboEvent::TransitionSkipped { timestamp, .. } => *timestamp,
            TurboEvent::DeathmatchStarted { timestamp, .. } => *timestamp,
            TurboEvent::VoteCast { timestamp, .. } => *timestamp,
            TurboEvent::SessionResolved { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TurboEvent::SessionCreated { .. } => "session_created",
            TurboEvent::MemberJoined { .. } => "member_joined",
            TurboEvent::PhaseChanged { .. } => "phase_changed",
            TurboEvent::SwipeRecorded { .. } => "swipe_recorded",
            TurboEvent::BenchmarkHit { .. } => "benchmark_hit",
            TurboEvent::TransitionSkipped { .. } => "transition_skipped",
            TurboEvent::DeathmatchStarted { .. } => "deathmatch_started",
            TurboEvent::VoteCast { .. } => "vote_cast",
            TurboEvent::SessionResolved { .. } => "session_resolved",
        }
    }

    /// Every event is scoped to one session
    pub fn session_id(&self) -> &str {
        match self {
            TurboEvent::SessionCreated { session_id, .. }
            | TurboEvent::MemberJoined { session_id, .. }
            | TurboEvent::PhaseChanged { session_id, .. }
            | TurboEvent::SwipeRecorded { session_id, .. }
            | TurboEvent::BenchmarkHit { session_id, .. }
            | TurboEvent::TransitionSkipped { session_id, .. }
            | TurboEvent::DeathmatchStarted { session_id, .. }
            | TurboEvent::VoteCast { session_id, .. }
            | TurboEvent::SessionResolved { session_id, .. } => session_id,
        }
    }

    /// Get the participant ID if a participant caused this event
    pub fn participant_id(&self) -> Option<&str> {
        match self {
            TurboEvent::MemberJoined { participant_id, .. } => Some(participant_id),
            TurboEvent::SwipeRecorded { participant_id, .. } => Some(participant_id),
            TurboEvent::VoteCast { participant_id, .. } => Some(participant_id),
            TurboEvent::SessionCreated { created_by, .. } => created_by.as_deref(),
            _ => None,
        }
    }

    /// The phase entered, if this is a phase change
    pub fn entered_state(&self) -> Option<TurboState> {
        match self {
            TurboEvent::PhaseChanged { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Create a new unique event ID
    pub fn new_id() -> EventId {
        uuid::Uuid::new_v4().to_string()
    }
}
