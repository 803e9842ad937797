//! WebSocket streaming of session snapshots
//!
//! Connect to `/api/v1/sessions/:id/ws` to receive the current snapshot
//! and then every committed snapshot of that session as JSON text frames.
//! The server closes the socket once the session reaches results.
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌──────────────┐     broadcast    ┌─────────────┐
//! │   Client    │ ←───────────────── │ turbo-server │ ←─────────────── │ Session     │
//! │ (swipe UI)  │                    │              │                  │ actor       │
//! └─────────────┘                    └──────────────┘                  └─────────────┘
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use turbo_coordination::{Session, SessionSubscription};

use crate::api::AppState;
use crate::error::ApiError;

/// Frames pushed to WebSocket clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionFrame {
    /// A committed snapshot
    Snapshot { session: Session },
}

/// WebSocket handler for one session's snapshots
pub async fn ws_session_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Subscribe before upgrading so unknown sessions get a 404
    let subscription = state.subscribe(&id).await?;
    Ok(ws.on_upgrade(move |socket| handle_session_socket(socket, id, subscription)))
}

async fn handle_session_socket(
    mut socket: WebSocket,
    session_id: String,
    mut subscription: SessionSubscription,
) {
    info!(session_id = %session_id, "WebSocket client subscribed");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session_id = %session_id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!(session_id = %session_id, "WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            snapshot = subscription.next() => {
                let Some(session) = snapshot else { break };
                let terminal = session.state.is_terminal();

                if let Err(e) = send_frame(&mut socket, SessionFrame::Snapshot { session }).await {
                    warn!(session_id = %session_id, "Failed to send snapshot: {}", e);
                    break;
                }
                if terminal {
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(session_id = %session_id, "Failed to send close frame: {}", e);
                    }
                    break;
                }
            }
        }
    }
}

/// Send a frame over WebSocket
async fn send_frame(socket: &mut WebSocket, frame: SessionFrame) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&frame).map_err(axum::Error::new)?;
    socket.send(Message::Text(json)).await
}
