//! Timed phase transitions
//!
//! Watches committed phase changes on the event bus and fires the follow-up
//! transition when its deadline passes:
//!
//! - briefing → `start_sprint` after the briefing delay
//! - sprint → `expire_sprint` at `sprint.ends_at`
//! - deathmatch → `expire_deathmatch` at `deathmatch.ends_at`
//!
//! Clients may call the same operations themselves. Whichever arrives second
//! is rejected or does nothing, so the scheduler never double-applies.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::coordinator::{SharedTurboCoordinator, TurboError};
use crate::events::{SessionUpdate, TurboEvent};
use crate::state::{Session, TurboState};

/// Slack added past each deadline so the transition is not refused as early
const DEADLINE_GRACE: std::time::Duration = std::time::Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    StartSprint,
    ExpireSprint,
    ExpireDeathmatch,
}

impl Timer {
    fn name(self) -> &'static str {
        match self {
            Timer::StartSprint => "start_sprint",
            Timer::ExpireSprint => "expire_sprint",
            Timer::ExpireDeathmatch => "expire_deathmatch",
        }
    }
}

/// Background task driving timed transitions for every session
pub struct PhaseScheduler {
    coordinator: SharedTurboCoordinator,
    cancel: CancellationToken,
}

impl PhaseScheduler {
    pub fn new(coordinator: SharedTurboCoordinator, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            cancel,
        }
    }

    /// Start listening; the task ends when the token is cancelled or the bus closes
    pub fn spawn(self) -> JoinHandle<()> {
        let receiver = self.coordinator.event_bus().subscribe();
        tokio::spawn(self.run(receiver))
    }

    async fn run(self, mut receiver: broadcast::Receiver<SessionUpdate>) {
        info!("Phase scheduler started");
        loop {
            let update = tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = receiver.recv() => received,
            };

            match update {
                Ok(update) => self.on_update(&update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Phase scheduler lagged; some timers may be missed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("Phase scheduler stopped");
    }

    fn on_update(&self, update: &SessionUpdate) {
        for entered in update.events.iter().filter_map(TurboEvent::entered_state) {
            if let Some((timer, deadline)) = self.timer_for(entered, &update.snapshot) {
                self.arm(update.snapshot.id.clone(), timer, deadline);
            }
        }
    }

    fn timer_for(&self, entered: TurboState, session: &Session) -> Option<(Timer, DateTime<Utc>)> {
        match entered {
            TurboState::Briefing => session
                .briefing_started_at
                .map(|at| (Timer::StartSprint, at + self.coordinator.config().briefing_delay())),
            TurboState::Sprint => session
                .sprint
                .as_ref()
                .map(|sprint| (Timer::ExpireSprint, sprint.ends_at)),
            TurboState::Deathmatch => session
                .deathmatch
                .as_ref()
                .map(|dm| (Timer::ExpireDeathmatch, dm.ends_at)),
            TurboState::Lobby | TurboState::Results => None,
        }
    }

    fn arm(&self, session_id: String, timer: Timer, deadline: DateTime<Utc>) {
        let coordinator = self.coordinator.clone();
        let cancel = self.cancel.clone();
        let wait = (deadline - Utc::now()).to_std().unwrap_or_default() + DEADLINE_GRACE;
        debug!(session_id = %session_id, timer = timer.name(), ?wait, "Timer armed");

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }

            let result = match timer {
                Timer::StartSprint => coordinator.start_sprint(&session_id).await,
                Timer::ExpireSprint => coordinator.expire_sprint(&session_id).await,
                Timer::ExpireDeathmatch => coordinator.expire_deathmatch(&session_id).await,
            };

            match result {
                Ok(session) => {
                    info!(
                        session_id = %session_id,
                        timer = timer.name(),
                        state = %session.state,
                        "Timer fired"
                    );
                }
                Err(e @ (TurboError::InvalidTransition { .. } | TurboError::DeadlineNotReached { .. })) => {
                    debug!(session_id = %session_id, timer = timer.name(), "Timer superseded: {}", e);
                }
                Err(e) => {
                    warn!(session_id = %session_id, timer = timer.name(), "Timer failed: {}", e);
                }
            }
        });
    }
}
