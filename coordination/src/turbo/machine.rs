//! Session state machine: guarded transitions over the session document.
//!
//! Every method mutates a `Session` in place and returns the events it
//! produced. An empty list means nothing changed. Methods never touch the
//! store; the session actor loads, applies and commits.

use chrono::{DateTime, Duration, Utc};

use super::benchmark::{self, QuorumRule};
use super::deathmatch::{self, VoteChange};
use super::tally::{self, TopSelection};
use crate::events::TurboEvent;
use crate::state::{
    CandidateSummary, Choice, DeathmatchInfo, DecidedBy, Member, Session, SessionOutcome,
    SprintInfo, SwipeRecord, TurboState,
};

/// Error for transitions that are not legal right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: TurboState,
    },

    #[error("participant {0} has not joined this session")]
    UnknownParticipant(String),

    #[error("deadline {deadline} has not passed")]
    DeadlineNotReached { deadline: DateTime<Utc> },
}

/// Result type for transitions.
pub type TransitionResult<T> = Result<T, TransitionError>;

impl Session {
    fn guard(&self, operation: &'static str, allowed: &[TurboState]) -> TransitionResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn change_phase(&mut self, to: TurboState, now: DateTime<Utc>) -> TurboEvent {
        let from = self.state;
        debug_assert!(to > from, "phase must move forward: {from} -> {to}");
        self.state = to;
        self.touch(now);
        TurboEvent::PhaseChanged {
            session_id: self.id.clone(),
            from,
            to,
            timestamp: now,
        }
    }

    /// Add a participant; a no-op if they already joined. Allowed in any state.
    pub fn join(&mut self, participant_id: &str, now: DateTime<Utc>) -> Vec<TurboEvent> {
        if self.is_member(participant_id) {
            return Vec::new();
        }
        self.members
            .insert(participant_id.to_string(), Member::new(now));
        self.touch(now);
        vec![TurboEvent::MemberJoined {
            session_id: self.id.clone(),
            participant_id: participant_id.to_string(),
            timestamp: now,
        }]
    }

    /// lobby → briefing
    pub fn start_briefing(&mut self, now: DateTime<Utc>) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("start_briefing", &[TurboState::Lobby])?;
        self.briefing_started_at = Some(now);
        Ok(vec![self.change_phase(TurboState::Briefing, now)])
    }

    /// lobby | briefing → sprint
    pub fn start_sprint(
        &mut self,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("start_sprint", &[TurboState::Lobby, TurboState::Briefing])?;
        self.sprint = Some(SprintInfo {
            started_at: now,
            ends_at: now + duration,
            benchmark_hit: false,
        });
        Ok(vec![self.change_phase(TurboState::Sprint, now)])
    }

    /// Count a stored swipe against its participant.
    ///
    /// `overwrite` is true when the swipe replaced an earlier one on the same
    /// candidate; overwrites do not raise `swipe_count`. Unknown participants
    /// are joined on their first swipe.
    pub fn apply_swipe(
        &mut self,
        swipe: &SwipeRecord,
        overwrite: bool,
    ) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("record_swipe", &[TurboState::Sprint])?;
        let now = swipe.timestamp;

        let mut events = self.join(&swipe.participant_id, now);
        let member = self
            .members
            .get_mut(&swipe.participant_id)
            .ok_or_else(|| TransitionError::UnknownParticipant(swipe.participant_id.clone()))?;

        if !overwrite {
            member.swipe_count += 1;
        }
        member.active = true;
        let swipe_count = member.swipe_count;
        self.touch(now);

        events.push(TurboEvent::SwipeRecorded {
            session_id: self.id.clone(),
            participant_id: swipe.participant_id.clone(),
            activity_id: swipe.activity_id.clone(),
            decision: swipe.decision,
            overwrite,
            swipe_count,
            timestamp: now,
        });
        Ok(events)
    }

    /// Re-evaluate the benchmark and enter the deathmatch when it is met.
    ///
    /// With fewer than two swiped candidates the transition is skipped and a
    /// `TransitionSkipped` event is produced; the sprint continues and the
    /// next swipe tries again.
    pub fn check_benchmark(
        &mut self,
        swipes: &[SwipeRecord],
        rule: QuorumRule,
        now: DateTime<Utc>,
    ) -> Vec<TurboEvent> {
        if self.state != TurboState::Sprint {
            return Vec::new();
        }

        let report = benchmark::evaluate(&self.members, self.min_swipes_per_person, rule);
        if !report.met {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(sprint) = self.sprint.as_mut() {
            if !sprint.benchmark_hit {
                sprint.benchmark_hit = true;
                events.push(TurboEvent::BenchmarkHit {
                    session_id: self.id.clone(),
                    counted_members: report.counted_members,
                    total_swipes: report.total_swipes,
                    target: report.target,
                    timestamp: now,
                });
            }
        }

        match tally::select_top2(swipes) {
            TopSelection::Pair(top2) => events.extend(self.begin_deathmatch(top2, now)),
            selection => {
                self.touch(now);
                events.push(TurboEvent::TransitionSkipped {
                    session_id: self.id.clone(),
                    from: self.state,
                    candidates: selection.found() as u32,
                    reason: "benchmark met with fewer than two swiped candidates".to_string(),
                    timestamp: now,
                });
            }
        }
        events
    }

    /// sprint → deathmatch with an explicit pair
    pub fn enter_deathmatch(
        &mut self,
        top2: [CandidateSummary; 2],
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("enter_deathmatch", &[TurboState::Sprint])?;
        Ok(self.begin_deathmatch(top2, now))
    }

    fn begin_deathmatch(&mut self, top2: [CandidateSummary; 2], now: DateTime<Utc>) -> Vec<TurboEvent> {
        let duration = Duration::seconds(i64::from(self.deathmatch_duration_seconds));
        let info = DeathmatchInfo::new(now, duration);
        let started = TurboEvent::DeathmatchStarted {
            session_id: self.id.clone(),
            option_a: top2[0].id.clone(),
            option_b: top2[1].id.clone(),
            ends_at: info.ends_at,
            timestamp: now,
        };

        self.top2 = Some(top2);
        self.deathmatch = Some(info);
        vec![self.change_phase(TurboState::Deathmatch, now), started]
    }

    /// Cast or switch a deathmatch vote; resolves on a majority of counted members.
    pub fn cast_vote(
        &mut self,
        participant_id: &str,
        choice: Choice,
        quorum_min_swipes: u32,
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("vote", &[TurboState::Deathmatch])?;
        if !self.is_member(participant_id) {
            return Err(TransitionError::UnknownParticipant(participant_id.to_string()));
        }

        let counted = self.counted_members(quorum_min_swipes);
        let session_id = self.id.clone();
        let dm = self.deathmatch.as_mut().ok_or(TransitionError::InvalidState {
            operation: "vote",
            state: self.state,
        })?;

        let change = deathmatch::apply_vote(dm, participant_id, choice);
        if change == VoteChange::Unchanged {
            return Ok(Vec::new());
        }

        let mut events = vec![TurboEvent::VoteCast {
            session_id,
            participant_id: participant_id.to_string(),
            choice,
            previous: change.previous(),
            votes_a: dm.votes_a,
            votes_b: dm.votes_b,
            timestamp: now,
        }];

        match deathmatch::majority_winner(dm, counted) {
            Some(winner) => events.extend(self.finish(winner, DecidedBy::Vote, now)),
            None => self.touch(now),
        }
        Ok(events)
    }

    /// deathmatch → results with the given winner. Write-once.
    pub fn resolve(
        &mut self,
        winner: Choice,
        decided_by: DecidedBy,
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        self.guard("resolve", &[TurboState::Deathmatch])?;
        Ok(self.finish(winner, decided_by, now))
    }

    fn finish(&mut self, winner: Choice, decided_by: DecidedBy, now: DateTime<Utc>) -> Vec<TurboEvent> {
        let activity = self.top2.as_ref().map(|pair| pair[winner.index()].clone());
        self.settle(winner, activity, decided_by, now)
    }

    fn settle(
        &mut self,
        winner: Choice,
        winning_activity: Option<CandidateSummary>,
        decided_by: DecidedBy,
        now: DateTime<Utc>,
    ) -> Vec<TurboEvent> {
        let (votes_a, votes_b) = self
            .deathmatch
            .as_ref()
            .map(|dm| (dm.votes_a, dm.votes_b))
            .unwrap_or((0, 0));
        let activity_id = winning_activity.as_ref().map(|c| c.id.clone());

        self.result = Some(SessionOutcome {
            winner,
            winning_activity,
            votes_a,
            votes_b,
            completed_at: now,
            decided_by,
        });

        vec![
            self.change_phase(TurboState::Results, now),
            TurboEvent::SessionResolved {
                session_id: self.id.clone(),
                winner,
                activity_id,
                decided_by,
                votes_a,
                votes_b,
                timestamp: now,
            },
        ]
    }

    /// End the deathmatch now.
    ///
    /// A host choice wins outright; otherwise the vote leader wins and a tie
    /// goes to A. Calling this once the session is in results is a no-op.
    pub fn force_end(
        &mut self,
        host_choice: Option<Choice>,
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        if self.state == TurboState::Results {
            return Ok(Vec::new());
        }
        self.guard("force_end", &[TurboState::Deathmatch])?;

        let (winner, decided_by) = match self.deathmatch.as_ref() {
            Some(dm) => deathmatch::forced_winner(dm, host_choice),
            None => (host_choice.unwrap_or(Choice::A), DecidedBy::Host),
        };
        Ok(self.finish(winner, decided_by, now))
    }

    /// End the sprint once `sprint.ends_at` has passed, whatever the benchmark says.
    ///
    /// Two or more swiped candidates start the deathmatch. A single candidate
    /// wins by timeout; with nothing swiped the session resolves by timeout
    /// without an activity. A no-op once the sprint is already over.
    pub fn expire_sprint(
        &mut self,
        swipes: &[SwipeRecord],
        now: DateTime<Utc>,
    ) -> TransitionResult<Vec<TurboEvent>> {
        if self.state > TurboState::Sprint {
            return Ok(Vec::new());
        }
        self.guard("expire_sprint", &[TurboState::Sprint])?;

        if let Some(sprint) = &self.sprint {
            if now < sprint.ends_at {
                return Err(TransitionError::DeadlineNotReached {
                    deadline: sprint.ends_at,
                });
            }
        }

        Ok(match tally::select_top2(swipes) {
            TopSelection::Pair(top2) => self.begin_deathmatch(top2, now),
            TopSelection::Single(only) => self.settle(Choice::A, Some(only), DecidedBy::Timeout, now),
            TopSelection::Empty => self.settle(Choice::A, None, DecidedBy::Timeout, now),
        })
    }

    /// Force-end the deathmatch once `deathmatch.ends_at` has passed.
    pub fn expire_deathmatch(&mut self, now: DateTime<Utc>) -> TransitionResult<Vec<TurboEvent>> {
        if self.state == TurboState::Results {
            return Ok(Vec::new());
        }
        self.guard("expire_deathmatch", &[TurboState::Deathmatch])?;

        if let Some(dm) = &self.deathmatch {
            if now < dm.ends_at {
                return Err(TransitionError::DeadlineNotReached {
                    deadline: dm.ends_at,
                });
            }
        }
        self.force_end(None, now)
    }
}
