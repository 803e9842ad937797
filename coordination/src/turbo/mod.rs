//! Turbo-mode session coordination
//!
//! A group moves through `lobby → briefing → sprint → deathmatch → results`:
//!
//! 1. **Tally** (`tally.rs`): rank swiped candidates by approval and
//!    pick the top two.
//!
//! 2. **Benchmark** (`benchmark.rs`): decide when enough members have
//!    swiped enough to end the sprint early.
//!
//! 3. **Deathmatch** (`deathmatch.rs`): one switchable vote per member,
//!    majority or forced resolution.
//!
//! 4. **Machine** (`machine.rs`): the pure transitions on a [`Session`],
//!    each producing the events it caused.
//!
//! 5. **Coordinator** (`coordinator.rs` + `actor.rs`): the public facade.
//!    Each session is owned by one actor task that commits through the
//!    store's compare-and-swap, so every phase change happens at most once.
//!
//! 6. **Scheduler** (`scheduler.rs`): optional timers for the briefing
//!    delay and the sprint/deathmatch deadlines.
//!
//! [`Session`]: crate::state::Session

pub mod actor;
pub mod benchmark;
pub mod config;
pub mod coordinator;
pub mod deathmatch;
pub mod machine;
pub mod scheduler;
pub mod tally;

pub use actor::SwipeRequest;
pub use benchmark::{BenchmarkReport, QuorumRule};
pub use config::TurboConfig;
pub use coordinator::{
    SessionSubscription, SharedTurboCoordinator, SwipeOutcome, TurboCoordinator, TurboError,
    TurboResult,
};
pub use deathmatch::VoteChange;
pub use machine::{TransitionError, TransitionResult};
pub use scheduler::PhaseScheduler;
pub use tally::TopSelection;
