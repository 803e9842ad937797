//! Turbo coordinator - public entry point for session operations
//!
//! The coordinator owns a registry of session actors. Every mutating call is
//! routed to the actor that owns the session, which applies it serially and
//! commits through the store's compare-and-swap. Reads go straight to the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use super::actor::{Command, SessionActor, SwipeRequest};
use super::benchmark::{self, BenchmarkReport};
use super::config::TurboConfig;
use super::machine::TransitionError;
use crate::events::{
    EventBusExt, EventFilter, EventHistory, FilteredReceiver, SessionUpdate, SharedEventBus,
    TurboEvent,
};
use crate::state::{
    Choice, ParticipantId, Session, SessionId, SharedSessionStore, StoreError, SwipeDecision,
    TurboState,
};

/// Queue depth for each session actor
const ACTOR_QUEUE_CAPACITY: usize = 64;

/// Error type for coordinator operations
#[derive(Debug, thiserror::Error)]
pub enum TurboError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("{operation} is not allowed in state {state}")]
    InvalidTransition {
        operation: &'static str,
        state: TurboState,
    },

    #[error("Only {found} swiped candidate(s); the deathmatch needs two")]
    InsufficientCandidates { found: u32 },

    #[error("No participant identity supplied")]
    MissingParticipant,

    #[error("Participant {0} has not joined this session")]
    UnknownParticipant(ParticipantId),

    #[error("Deadline {deadline} has not passed")]
    DeadlineNotReached { deadline: DateTime<Utc> },

    #[error("Invalid group size: {0}")]
    InvalidGroupSize(u32),

    #[error("Gave up on session {session_id} after {attempts} conflicting commits")]
    Contention { session_id: SessionId, attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session owner unavailable: {0}")]
    Unavailable(SessionId),
}

impl TurboError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            TurboError::NotFound(_) => "not_found",
            TurboError::InvalidTransition { .. } => "invalid_transition",
            TurboError::InsufficientCandidates { .. } => "insufficient_candidates",
            TurboError::MissingParticipant => "missing_participant",
            TurboError::UnknownParticipant(_) => "unknown_participant",
            TurboError::DeadlineNotReached { .. } => "deadline_not_reached",
            TurboError::InvalidGroupSize(_) => "invalid_group_size",
            TurboError::Contention { .. } => "contention",
            TurboError::Store(_) => "store",
            TurboError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<TransitionError> for TurboError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidState { operation, state } => {
                TurboError::InvalidTransition { operation, state }
            }
            TransitionError::UnknownParticipant(p) => TurboError::UnknownParticipant(p),
            TransitionError::DeadlineNotReached { deadline } => {
                TurboError::DeadlineNotReached { deadline }
            }
        }
    }
}

/// Result type for coordinator operations
pub type TurboResult<T> = Result<T, TurboError>;

/// Shared reference to TurboCoordinator
pub type SharedTurboCoordinator = Arc<TurboCoordinator>;

/// Result of recording a swipe
#[derive(Debug)]
pub struct SwipeOutcome {
    /// Snapshot after the swipe was committed
    pub session: Session,
    /// A transition that was due but skipped (`InsufficientCandidates`)
    pub deferred: Option<TurboError>,
}

/// Central entry point for turbo session operations
pub struct TurboCoordinator {
    store: SharedSessionStore,
    event_bus: SharedEventBus,
    config: Arc<TurboConfig>,
    actors: Mutex<HashMap<SessionId, mpsc::Sender<Command>>>,
}

impl TurboCoordinator {
    /// Create a new coordinator
    pub fn new(store: SharedSessionStore, event_bus: SharedEventBus, config: TurboConfig) -> Self {
        Self {
            store,
            event_bus,
            config: Arc::new(config),
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// Create a shared reference to this coordinator
    pub fn shared(self) -> SharedTurboCoordinator {
        Arc::new(self)
    }

    pub fn config(&self) -> &TurboConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.event_bus
    }

    /// Number of live session actors
    pub async fn active_actors(&self) -> usize {
        let mut actors = self.actors.lock().await;
        actors.retain(|_, tx| !tx.is_closed());
        actors.len()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Create a session in the lobby
    pub async fn create_session(
        &self,
        group_size: u32,
        created_by: Option<ParticipantId>,
    ) -> TurboResult<Session> {
        if group_size == 0 {
            return Err(TurboError::InvalidGroupSize(group_size));
        }

        let now = Utc::now();
        let mut session = Session::new(group_size, now);
        if let Some(creator) = created_by.filter(|c| !c.trim().is_empty()) {
            session = session.with_creator(creator);
        }

        self.store.insert_session(&session).await?;

        let event = TurboEvent::SessionCreated {
            session_id: session.id.clone(),
            group_size,
            created_by: session.created_by.clone(),
            timestamp: now,
        };
        if let Err(e) = self
            .event_bus
            .publish(SessionUpdate::new(session.clone(), vec![event]))
            .await
        {
            warn!(session_id = %session.id, "Failed to publish session creation: {}", e);
        }

        info!(
            session_id = %session.id,
            group_size,
            min_swipes = session.min_swipes_per_person,
            "Turbo session created"
        );
        Ok(session)
    }

    /// Add a participant; joining twice is a no-op
    pub async fn join(&self, session_id: &str, participant_id: &str) -> TurboResult<Session> {
        let participant_id = require_participant(participant_id)?;
        self.dispatch(session_id, |reply| Command::Join {
            participant_id: participant_id.clone(),
            reply,
        })
        .await
    }

    /// lobby → briefing
    pub async fn start_briefing(&self, session_id: &str) -> TurboResult<Session> {
        self.dispatch(session_id, |reply| Command::StartBriefing { reply })
            .await
    }

    /// lobby | briefing → sprint
    pub async fn start_sprint(&self, session_id: &str) -> TurboResult<Session> {
        self.dispatch(session_id, |reply| Command::StartSprint { reply })
            .await
    }

    /// Upsert a swipe and re-check the benchmark
    pub async fn record_swipe(
        &self,
        session_id: &str,
        participant_id: &str,
        activity_id: &str,
        decision: SwipeDecision,
        activity_name: &str,
    ) -> TurboResult<SwipeOutcome> {
        self.record_swipe_with(
            session_id,
            SwipeRequest {
                participant_id: participant_id.to_string(),
                activity_id: activity_id.to_string(),
                decision,
                activity_name: activity_name.to_string(),
                rating: None,
            },
        )
        .await
    }

    /// Upsert a swipe carrying optional candidate metadata
    pub async fn record_swipe_with(
        &self,
        session_id: &str,
        mut request: SwipeRequest,
    ) -> TurboResult<SwipeOutcome> {
        request.participant_id = require_participant(&request.participant_id)?;
        self.dispatch(session_id, |reply| Command::Swipe {
            request: request.clone(),
            reply,
        })
        .await
    }

    /// Cast or switch a deathmatch vote
    pub async fn vote(
        &self,
        session_id: &str,
        participant_id: &str,
        choice: Choice,
    ) -> TurboResult<Session> {
        let participant_id = require_participant(participant_id)?;
        self.dispatch(session_id, |reply| Command::Vote {
            participant_id: participant_id.clone(),
            choice,
            reply,
        })
        .await
    }

    /// Resolve the deathmatch now; a no-op once in results
    pub async fn force_end(
        &self,
        session_id: &str,
        host_choice: Option<Choice>,
    ) -> TurboResult<Session> {
        self.dispatch(session_id, |reply| Command::ForceEnd { host_choice, reply })
            .await
    }

    /// End the sprint once its deadline has passed
    pub async fn expire_sprint(&self, session_id: &str) -> TurboResult<Session> {
        self.dispatch(session_id, |reply| Command::ExpireSprint { reply })
            .await
    }

    /// Force-end the deathmatch once its deadline has passed
    pub async fn expire_deathmatch(&self, session_id: &str) -> TurboResult<Session> {
        self.dispatch(session_id, |reply| Command::ExpireDeathmatch { reply })
            .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current snapshot
    pub async fn get_session(&self, session_id: &str) -> TurboResult<Session> {
        self.store
            .load_session(session_id)
            .await?
            .ok_or_else(|| TurboError::NotFound(session_id.to_string()))
    }

    /// Sprint progress toward the benchmark
    pub async fn benchmark(&self, session_id: &str) -> TurboResult<BenchmarkReport> {
        let session = self.get_session(session_id).await?;
        Ok(benchmark::evaluate(
            &session.members,
            session.min_swipes_per_person,
            self.config.quorum_rule(),
        ))
    }

    /// Receive the current snapshot, then every committed snapshot
    pub async fn subscribe(&self, session_id: &str) -> TurboResult<SessionSubscription> {
        // Subscribe before reading so no commit falls between the two
        let receiver = self
            .event_bus
            .subscribe_filtered(EventFilter::new().session(session_id));
        let initial = self.get_session(session_id).await?;
        Ok(SessionSubscription::new(initial, receiver))
    }

    /// Read access to the session's event log
    pub fn history(&self) -> EventHistory {
        EventHistory::new(self.store.clone())
    }

    // =========================================================================
    // Actor registry
    // =========================================================================

    async fn actor_for(&self, session_id: &str) -> TurboResult<mpsc::Sender<Command>> {
        if let Some(tx) = self.live_actor(session_id).await {
            return Ok(tx);
        }

        // The registry lock is not held across the store read
        if self.store.load_session(session_id).await?.is_none() {
            return Err(TurboError::NotFound(session_id.to_string()));
        }

        let mut actors = self.actors.lock().await;
        if let Some(tx) = actors.get(session_id).filter(|tx| !tx.is_closed()) {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel(ACTOR_QUEUE_CAPACITY);
        let actor = SessionActor::new(
            session_id.to_string(),
            self.store.clone(),
            self.event_bus.clone(),
            self.config.clone(),
            rx,
        );
        tokio::spawn(actor.run());
        actors.insert(session_id.to_string(), tx.clone());
        debug!(session_id, "Session actor spawned");
        Ok(tx)
    }

    async fn live_actor(&self, session_id: &str) -> Option<mpsc::Sender<Command>> {
        let actors = self.actors.lock().await;
        actors
            .get(session_id)
            .filter(|tx| !tx.is_closed())
            .cloned()
    }

    async fn dispatch<T, F>(&self, session_id: &str, make: F) -> TurboResult<T>
    where
        F: Fn(oneshot::Sender<TurboResult<T>>) -> Command,
    {
        // A closed queue means the actor went idle; respawn once and resend
        for _ in 0..2 {
            let sender = self.actor_for(session_id).await?;
            let (reply_tx, reply_rx) = oneshot::channel();

            if sender.send(make(reply_tx)).await.is_err() {
                let mut actors = self.actors.lock().await;
                if actors
                    .get(session_id)
                    .is_some_and(|current| current.same_channel(&sender))
                {
                    actors.remove(session_id);
                }
                continue;
            }

            return reply_rx
                .await
                .map_err(|_| TurboError::Unavailable(session_id.to_string()))?;
        }

        Err(TurboError::Unavailable(session_id.to_string()))
    }
}

fn require_participant(participant_id: &str) -> TurboResult<ParticipantId> {
    let trimmed = participant_id.trim();
    if trimmed.is_empty() {
        Err(TurboError::MissingParticipant)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Stream of snapshots for one session
pub struct SessionSubscription {
    initial: Option<Session>,
    receiver: FilteredReceiver,
    last_revision: u64,
}

impl SessionSubscription {
    fn new(initial: Session, receiver: FilteredReceiver) -> Self {
        Self {
            last_revision: initial.revision,
            initial: Some(initial),
            receiver,
        }
    }

    /// Next snapshot; `None` once the bus is gone
    ///
    /// Snapshots older than one already delivered are dropped. A subscriber
    /// that falls behind skips the updates it missed.
    pub async fn next(&mut self) -> Option<Session> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.receiver.recv().await {
                Ok(update) => {
                    if update.revision() <= self.last_revision {
                        continue;
                    }
                    self.last_revision = update.revision();
                    return Some(update.snapshot.as_ref().clone());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber lagged; skipping to newer snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Deliver every snapshot to a callback until the session resolves or the bus closes
    pub async fn for_each<F>(mut self, mut on_snapshot: F)
    where
        F: FnMut(&Session),
    {
        while let Some(snapshot) = self.next().await {
            on_snapshot(&snapshot);
            if snapshot.state.is_terminal() {
                break;
            }
        }
    }
}
