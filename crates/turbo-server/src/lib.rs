//! HTTP/WebSocket front door for turbo-mode sessions.
//!
//! Translates requests into [`TurboCoordinator`] calls and streams committed
//! snapshots to subscribed clients. Participant identity arrives in the
//! `x-participant-id` header.
//!
//! [`TurboCoordinator`]: turbo_coordination::TurboCoordinator

pub mod api;
pub mod config;
pub mod error;
pub mod ws;

pub use api::{build_router, AppState, PARTICIPANT_HEADER};
pub use config::ServerArgs;
pub use error::ApiError;
