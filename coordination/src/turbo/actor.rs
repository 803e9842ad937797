//! Per-session actor
//!
//! Each live session is owned by one task that applies commands one at a
//! time: load the snapshot, run the transition, compare-and-swap the next
//! revision. A lost revision race reloads and retries up to
//! `max_commit_retries` times. The actor stops after sitting idle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::TurboConfig;
use super::coordinator::{SwipeOutcome, TurboError, TurboResult};
use super::machine::TransitionResult;
use crate::events::{SessionUpdate, SharedEventBus, TurboEvent};
use crate::state::{Choice, Session, SharedSessionStore, SwipeDecision, SwipeRecord};

/// A swipe as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub participant_id: String,
    pub activity_id: String,
    pub decision: SwipeDecision,
    #[serde(default)]
    pub activity_name: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// Messages processed by a session actor
pub(crate) enum Command {
    Join {
        participant_id: String,
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    StartBriefing {
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    StartSprint {
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    Swipe {
        request: SwipeRequest,
        reply: oneshot::Sender<TurboResult<SwipeOutcome>>,
    },
    Vote {
        participant_id: String,
        choice: Choice,
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    ForceEnd {
        host_choice: Option<Choice>,
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    ExpireSprint {
        reply: oneshot::Sender<TurboResult<Session>>,
    },
    ExpireDeathmatch {
        reply: oneshot::Sender<TurboResult<Session>>,
    },
}

pub(crate) struct SessionActor {
    session_id: String,
    store: SharedSessionStore,
    event_bus: SharedEventBus,
    config: Arc<TurboConfig>,
    receiver: mpsc::Receiver<Command>,
}

impl SessionActor {
    pub(crate) fn new(
        session_id: String,
        store: SharedSessionStore,
        event_bus: SharedEventBus,
        config: Arc<TurboConfig>,
        receiver: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            session_id,
            store,
            event_bus,
            config,
            receiver,
        }
    }

    pub(crate) async fn run(mut self) {
        let idle = self.config.actor_idle_timeout();

        loop {
            match tokio::time::timeout(idle, self.receiver.recv()).await {
                Ok(Some(command)) => self.handle(command).await,
                Ok(None) => break,
                Err(_) => {
                    // Refuse new sends, then finish whatever is already queued
                    self.receiver.close();
                    while let Some(command) = self.receiver.recv().await {
                        self.handle(command).await;
                    }
                    debug!(session_id = %self.session_id, "Session actor idle, stopping");
                    break;
                }
            }
        }
    }

    async fn handle(&self, command: Command) {
        let quorum_min_swipes = self.config.quorum_min_swipes;
        let sprint_duration = self.config.sprint_duration();

        match command {
            Command::Join {
                participant_id,
                reply,
            } => {
                let result = self
                    .apply(false, |session, _, now| Ok(session.join(&participant_id, now)))
                    .await;
                let _ = reply.send(result);
            }
            Command::StartBriefing { reply } => {
                let result = self
                    .apply(false, |session, _, now| session.start_briefing(now))
                    .await;
                let _ = reply.send(result);
            }
            Command::StartSprint { reply } => {
                let result = self
                    .apply(false, |session, _, now| {
                        session.start_sprint(sprint_duration, now)
                    })
                    .await;
                let _ = reply.send(result);
            }
            Command::Swipe { request, reply } => {
                let _ = reply.send(self.swipe(&request).await);
            }
            Command::Vote {
                participant_id,
                choice,
                reply,
            } => {
                let result = self
                    .apply(false, |session, _, now| {
                        session.cast_vote(&participant_id, choice, quorum_min_swipes, now)
                    })
                    .await;
                let _ = reply.send(result);
            }
            Command::ForceEnd { host_choice, reply } => {
                let result = self
                    .apply(false, |session, _, now| session.force_end(host_choice, now))
                    .await;
                let _ = reply.send(result);
            }
            Command::ExpireSprint { reply } => {
                let result = self
                    .apply(true, |session, swipes, now| session.expire_sprint(swipes, now))
                    .await;
                let _ = reply.send(result);
            }
            Command::ExpireDeathmatch { reply } => {
                let result = self
                    .apply(false, |session, _, now| session.expire_deathmatch(now))
                    .await;
                let _ = reply.send(result);
            }
        }
    }

    async fn load(&self) -> TurboResult<Session> {
        self.store
            .load_session(&self.session_id)
            .await?
            .ok_or_else(|| TurboError::NotFound(self.session_id.clone()))
    }

    /// Load, mutate and compare-and-swap until the write lands
    ///
    /// Returns the stored snapshot unchanged when the mutation produced no events.
    pub(crate) async fn apply<F>(&self, needs_swipes: bool, mut mutate: F) -> TurboResult<Session>
    where
        F: FnMut(&mut Session, &[SwipeRecord], DateTime<Utc>) -> TransitionResult<Vec<TurboEvent>>,
    {
        let mut attempts = 0;
        loop {
            let current = self.load().await?;
            let swipes = if needs_swipes {
                self.store.list_swipes(&self.session_id).await?
            } else {
                Vec::new()
            };

            let mut next = current.clone();
            let events = mutate(&mut next, &swipes, Utc::now())?;
            if events.is_empty() {
                return Ok(current);
            }
            next.revision = current.revision + 1;

            match self.store.compare_and_swap(&next, current.revision).await {
                Ok(()) => {
                    self.publish(&next, events).await;
                    return Ok(next);
                }
                Err(e) if e.is_conflict() => {
                    attempts += 1;
                    self.check_retry_budget(attempts, &e)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn swipe(&self, request: &SwipeRequest) -> TurboResult<SwipeOutcome> {
        let mut attempts = 0;
        loop {
            let current = self.load().await?;
            let now = Utc::now();

            let mut record = SwipeRecord::new(
                &self.session_id,
                &request.participant_id,
                &request.activity_id,
                request.decision,
                &request.activity_name,
            )
            .at(now);
            if let Some(rating) = request.rating {
                record = record.with_rating(rating);
            }

            let overwrite = self
                .store
                .get_swipe(&self.session_id, &request.participant_id, &request.activity_id)
                .await?
                .is_some();

            let mut next = current.clone();
            let mut events = next.apply_swipe(&record, overwrite)?;

            let mut swipes = self.store.list_swipes(&self.session_id).await?;
            swipes.retain(|s| !s.same_key(&record));
            swipes.push(record.clone());
            events.extend(next.check_benchmark(&swipes, self.config.quorum_rule(), now));

            let deferred = events.iter().find_map(|event| match event {
                TurboEvent::TransitionSkipped { candidates, .. } => {
                    Some(TurboError::InsufficientCandidates { found: *candidates })
                }
                _ => None,
            });

            next.revision = current.revision + 1;
            match self
                .store
                .commit_swipe(&next, current.revision, &record)
                .await
            {
                Ok(()) => {
                    debug!(
                        session_id = %self.session_id,
                        participant_id = %record.participant_id,
                        activity_id = %record.activity_id,
                        decision = %record.decision,
                        overwrite,
                        "Swipe recorded"
                    );
                    self.publish(&next, events).await;
                    return Ok(SwipeOutcome {
                        session: next,
                        deferred,
                    });
                }
                Err(e) if e.is_conflict() => {
                    attempts += 1;
                    self.check_retry_budget(attempts, &e)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn check_retry_budget(&self, attempts: u32, err: &crate::state::StoreError) -> TurboResult<()> {
        if attempts > self.config.max_commit_retries {
            warn!(session_id = %self.session_id, attempts, "Commit retries exhausted");
            return Err(TurboError::Contention {
                session_id: self.session_id.clone(),
                attempts,
            });
        }
        debug!(session_id = %self.session_id, attempts, "Revision conflict, retrying: {}", err);
        Ok(())
    }

    async fn publish(&self, session: &Session, events: Vec<TurboEvent>) {
        for event in &events {
            match event {
                TurboEvent::PhaseChanged { from, to, .. } => {
                    info!(session_id = %session.id, %from, %to, "Session phase changed");
                }
                TurboEvent::TransitionSkipped {
                    candidates, reason, ..
                } => {
                    warn!(session_id = %session.id, candidates, "Transition skipped: {}", reason);
                }
                TurboEvent::SessionResolved {
                    winner, decided_by, ..
                } => {
                    info!(session_id = %session.id, %winner, %decided_by, "Session resolved");
                }
                other => {
                    debug!(
                        session_id = %session.id,
                        participant_id = other.participant_id(),
                        event = other.event_type(),
                        "Event committed"
                    );
                }
            }
        }

        if let Err(e) = self
            .event_bus
            .publish(SessionUpdate::new(session.clone(), events))
            .await
        {
            warn!(session_id = %session.id, revision = session.revision, "Failed to publish update: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::state::store::MockSessionStore;
    use crate::state::{StoreError, TurboState};
    use mockall::Sequence;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn actor_with(store: MockSessionStore, config: TurboConfig) -> SessionActor {
        let (_tx, rx) = mpsc::channel(1);
        SessionActor::new(
            "s1".to_string(),
            Arc::new(store),
            EventBus::new().shared(),
            Arc::new(config),
            rx,
        )
    }

    fn loads_with_advancing_revision(store: &mut MockSessionStore) {
        let base = Session::new(4, Utc::now()).with_id("s1");
        let revision = AtomicU64::new(0);
        store.expect_load_session().returning(move |_| {
            let mut session = base.clone();
            session.revision = revision.fetch_add(1, Ordering::SeqCst);
            Ok(Some(session))
        });
    }

    #[tokio::test]
    async fn test_conflict_retried_on_fresh_read() {
        let mut store = MockSessionStore::new();
        loads_with_advancing_revision(&mut store);

        let mut seq = Sequence::new();
        store
            .expect_compare_and_swap()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|session, expected| {
                Err(StoreError::Conflict {
                    session_id: session.id.clone(),
                    expected,
                    found: expected + 1,
                })
            });
        store
            .expect_compare_and_swap()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|session, expected| *expected == 1 && session.revision == 2)
            .returning(|_, _| Ok(()));

        let actor = actor_with(store, TurboConfig::default());
        let session = actor
            .apply(false, |session, _, now| Ok(session.join("alice", now)))
            .await
            .unwrap();

        assert_eq!(session.revision, 2);
        assert!(session.is_member("alice"));
    }

    #[tokio::test]
    async fn test_contention_gives_up() {
        let mut store = MockSessionStore::new();
        loads_with_advancing_revision(&mut store);
        store
            .expect_compare_and_swap()
            .times(3)
            .returning(|session, expected| {
                Err(StoreError::Conflict {
                    session_id: session.id.clone(),
                    expected,
                    found: expected + 1,
                })
            });

        let config = TurboConfig {
            max_commit_retries: 2,
            ..TurboConfig::default()
        };
        let actor = actor_with(store, config);
        let err = actor
            .apply(false, |session, _, now| session.start_briefing(now))
            .await
            .unwrap_err();

        assert!(matches!(err, TurboError::Contention { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_noop_skips_write() {
        let mut store = MockSessionStore::new();
        let mut session = Session::new(4, Utc::now()).with_id("s1");
        session.join("alice", Utc::now());
        store
            .expect_load_session()
            .returning(move |_| Ok(Some(session.clone())));
        store.expect_compare_and_swap().never();

        let actor = actor_with(store, TurboConfig::default());
        let unchanged = actor
            .apply(false, |session, _, now| Ok(session.join("alice", now)))
            .await
            .unwrap();
        assert_eq!(unchanged.revision, 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockSessionStore::new();
        store
            .expect_load_session()
            .returning(|_| Err(StoreError::LockPoisoned));

        let actor = actor_with(store, TurboConfig::default());
        let err = actor
            .apply(false, |session, _, now| session.start_briefing(now))
            .await
            .unwrap_err();
        assert!(matches!(err, TurboError::Store(StoreError::LockPoisoned)));
    }

    #[tokio::test]
    async fn test_invalid_transition_not_written() {
        let mut store = MockSessionStore::new();
        let session = Session::new(4, Utc::now()).with_id("s1");
        store
            .expect_load_session()
            .returning(move |_| Ok(Some(session.clone())));
        store.expect_compare_and_swap().never();

        let actor = actor_with(store, TurboConfig::default());
        let err = actor
            .apply(false, |session, _, now| session.force_end(None, now))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TurboError::InvalidTransition {
                state: TurboState::Lobby,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_stops_when_idle() {
        let (tx, rx) = mpsc::channel(1);
        let actor = SessionActor::new(
            "s1".to_string(),
            Arc::new(MockSessionStore::new()),
            EventBus::new().shared(),
            Arc::new(TurboConfig {
                actor_idle_timeout_secs: 1,
                ..TurboConfig::default()
            }),
            rx,
        );

        let handle = tokio::spawn(actor.run());
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("actor should stop")
            .unwrap();
        assert!(tx.is_closed());
    }
}
