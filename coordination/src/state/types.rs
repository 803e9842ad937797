//! Core types for turbo-mode session coordination
//!
//! These types form the session document: the wire contract between the
//! coordinator, the session store and every rendering client. Field names
//! serialize in camelCase to match that contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for turbo sessions
pub type SessionId = String;

/// Stable participant identity supplied by the membership provider
pub type ParticipantId = String;

/// Opaque candidate (place/activity) identifier
pub type ActivityId = String;

/// Phase of a turbo session
///
/// Variants are declared in lifecycle order, so `Ord` reflects progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurboState {
    /// Participants are gathering
    Lobby,
    /// Short countdown before swiping starts
    Briefing,
    /// Timed swiping on the candidate list
    Sprint,
    /// Two-candidate majority runoff
    Deathmatch,
    /// Terminal; the result is fixed
    Results,
}

impl TurboState {
    /// Whether this is the terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Results)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Briefing => "briefing",
            Self::Sprint => "sprint",
            Self::Deathmatch => "deathmatch",
            Self::Results => "results",
        }
    }
}

impl std::fmt::Display for TurboState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A yes/no swipe on a candidate
///
/// Clients that speak in gesture terms may send `right`/`left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDecision {
    #[serde(alias = "right")]
    Yes,
    #[serde(alias = "left")]
    No,
}

impl std::fmt::Display for SwipeDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwipeDecision::Yes => write!(f, "yes"),
            SwipeDecision::No => write!(f, "no"),
        }
    }
}

/// One side of the deathmatch pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

impl Choice {
    /// Index into the top-2 pair
    pub fn index(self) -> usize {
        match self {
            Choice::A => 0,
            Choice::B => 1,
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Choice::A => write!(f, "A"),
            Choice::B => write!(f, "B"),
        }
    }
}

/// How a session result was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    Vote,
    Host,
    Timeout,
}

impl std::fmt::Display for DecidedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecidedBy::Vote => write!(f, "vote"),
            DecidedBy::Host => write!(f, "host"),
            DecidedBy::Timeout => write!(f, "timeout"),
        }
    }
}

/// A joined participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub joined_at: DateTime<Utc>,
    /// Number of distinct candidates this member has swiped
    pub swipe_count: u32,
    /// Set on the member's first recorded swipe
    pub active: bool,
}

impl Member {
    pub fn new(joined_at: DateTime<Utc>) -> Self {
        Self {
            joined_at,
            swipe_count: 0,
            active: false,
        }
    }

    /// Whether this member has swiped enough to count toward quorum and majority
    pub fn is_counted(&self, quorum_min_swipes: u32) -> bool {
        self.swipe_count >= quorum_min_swipes
    }
}

/// Sprint phase bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintInfo {
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub benchmark_hit: bool,
}

/// Candidate summary with its swipe tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub id: ActivityId,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f32>,
    pub yes_count: u32,
    pub no_count: u32,
}

impl CandidateSummary {
    pub fn new(id: impl Into<ActivityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rating: None,
            yes_count: 0,
            no_count: 0,
        }
    }

    pub fn total_votes(&self) -> u32 {
        self.yes_count + self.no_count
    }

    /// Share of yes swipes, 0.0 when nobody swiped
    pub fn approval_rating(&self) -> f64 {
        let total = self.total_votes();
        if total == 0 {
            0.0
        } else {
            f64::from(self.yes_count) / f64::from(total)
        }
    }
}

/// Deathmatch phase bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathmatchInfo {
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub votes_a: u32,
    pub votes_b: u32,
    pub voters: BTreeMap<ParticipantId, Choice>,
}

impl DeathmatchInfo {
    pub fn new(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at,
            ends_at: started_at + duration,
            votes_a: 0,
            votes_b: 0,
            voters: BTreeMap::new(),
        }
    }

    pub fn votes_for(&self, choice: Choice) -> u32 {
        match choice {
            Choice::A => self.votes_a,
            Choice::B => self.votes_b,
        }
    }
}

/// Final outcome of a session, written once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub winner: Choice,
    /// `None` when the sprint timed out with nothing swiped
    pub winning_activity: Option<CandidateSummary>,
    pub votes_a: u32,
    pub votes_b: u32,
    pub completed_at: DateTime<Utc>,
    pub decided_by: DecidedBy,
}

/// The shared session document, one per meetup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    /// Incremented on every committed write; guards compare-and-swap
    pub revision: u64,
    pub state: TurboState,
    #[serde(default)]
    pub created_by: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group_size: u32,
    pub min_swipes_per_person: u32,
    pub deathmatch_duration_seconds: u32,
    #[serde(default)]
    pub briefing_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub members: BTreeMap<ParticipantId, Member>,
    #[serde(default)]
    pub sprint: Option<SprintInfo>,
    #[serde(default)]
    pub top2: Option<[CandidateSummary; 2]>,
    #[serde(default)]
    pub deathmatch: Option<DeathmatchInfo>,
    #[serde(default)]
    pub result: Option<SessionOutcome>,
}

impl Session {
    /// Create a session in the lobby with group-size derived rules
    pub fn new(group_size: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            revision: 0,
            state: TurboState::Lobby,
            created_by: None,
            created_at: now,
            updated_at: now,
            group_size,
            min_swipes_per_person: min_swipes_for_group(group_size),
            deathmatch_duration_seconds: deathmatch_seconds_for_group(group_size),
            briefing_started_at: None,
            members: BTreeMap::new(),
            sprint: None,
            top2: None,
            deathmatch: None,
            result: None,
        }
    }

    /// Record the creating participant
    pub fn with_creator(mut self, participant_id: impl Into<ParticipantId>) -> Self {
        self.created_by = Some(participant_id.into());
        self
    }

    /// Use a caller-chosen ID
    pub fn with_id(mut self, id: impl Into<SessionId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn is_member(&self, participant_id: &str) -> bool {
        self.members.contains_key(participant_id)
    }

    /// Members whose swipe count reaches the quorum minimum
    pub fn counted_members(&self, quorum_min_swipes: u32) -> usize {
        self.members
            .values()
            .filter(|m| m.is_counted(quorum_min_swipes))
            .count()
    }
}

/// Minimum swipes each person is expected to make in the sprint
pub fn min_swipes_for_group(group_size: u32) -> u32 {
    match group_size {
        0..=4 => 8,
        5..=6 => 10,
        _ => 12,
    }
}

/// Deathmatch duration for a group
pub fn deathmatch_seconds_for_group(group_size: u32) -> u32 {
    if group_size <= 6 {
        30
    } else {
        45
    }
}

/// A single swipe, keyed by (session, participant, activity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRecord {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub activity_id: ActivityId,
    pub decision: SwipeDecision,
    pub activity_name: String,
    #[serde(default)]
    pub rating: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

impl SwipeRecord {
    pub fn new(
        session_id: impl Into<SessionId>,
        participant_id: impl Into<ParticipantId>,
        activity_id: impl Into<ActivityId>,
        decision: SwipeDecision,
        activity_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            participant_id: participant_id.into(),
            activity_id: activity_id.into(),
            decision,
            activity_name: activity_name.into(),
            rating: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the candidate's rating so top-2 summaries carry it
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this record occupies the same key as another
    pub fn same_key(&self, other: &SwipeRecord) -> bool {
        self.session_id == other.session_id
            && self.participant_id == other.participant_id
            && self.activity_id == other.activity_id
    }
}
