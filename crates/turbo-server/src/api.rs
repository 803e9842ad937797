//! HTTP API for turbo sessions.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use turbo_coordination::{
    BenchmarkReport, Choice, Session, SharedTurboCoordinator, SwipeDecision, SwipeRequest,
    TurboError, TurboEvent,
};

use crate::error::{ApiError, ErrorBody};
use crate::ws::ws_session_handler;

pub type AppState = SharedTurboCoordinator;

/// Header carrying the caller's participant id
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Sessions
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/:id", get(get_session))
        .route("/api/v1/sessions/:id/join", post(join))
        // Phase changes
        .route("/api/v1/sessions/:id/briefing", post(start_briefing))
        .route("/api/v1/sessions/:id/sprint", post(start_sprint))
        .route("/api/v1/sessions/:id/expire-sprint", post(expire_sprint))
        .route("/api/v1/sessions/:id/expire-deathmatch", post(expire_deathmatch))
        .route("/api/v1/sessions/:id/force-end", post(force_end))
        // Swipes and votes
        .route("/api/v1/sessions/:id/swipes", post(record_swipe))
        .route("/api/v1/sessions/:id/votes", post(vote))
        // Progress, history and live snapshots
        .route("/api/v1/sessions/:id/benchmark", get(benchmark))
        .route("/api/v1/sessions/:id/events", get(events))
        .route("/api/v1/sessions/:id/ws", get(ws_session_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Participant id from the identity header, if one was sent
fn participant(headers: &HeaderMap) -> Option<String> {
    headers
        .get(PARTICIPANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn require_participant(headers: &HeaderMap) -> Result<String, ApiError> {
    participant(headers).ok_or(ApiError::Turbo(TurboError::MissingParticipant))
}

// --- Health ---

async fn health() -> &'static str {
    "OK"
}

// --- Sessions ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    group_size: u32,
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .create_session(req.group_size, participant(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.get_session(&id).await?))
}

async fn join(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Session>, ApiError> {
    let participant_id = require_participant(&headers)?;
    Ok(Json(state.join(&id, &participant_id).await?))
}

// --- Phase changes ---

async fn start_briefing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.start_briefing(&id).await?))
}

async fn start_sprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.start_sprint(&id).await?))
}

async fn expire_sprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.expire_sprint(&id).await?))
}

async fn expire_deathmatch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.expire_deathmatch(&id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceEndRequest {
    host_choice: Option<Choice>,
}

async fn force_end(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<ForceEndRequest>>,
) -> Result<Json<Session>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session = state.get_session(&id).await?;

    // Sessions without a recorded creator treat every caller as host
    let is_host = match &session.created_by {
        Some(host) => participant(&headers).as_deref() == Some(host.as_str()),
        None => true,
    };

    match (is_host, req.host_choice) {
        (true, host_choice) => Ok(Json(state.force_end(&id, host_choice).await?)),
        // Anyone else only gets the timeout path, which checks the deadline
        (false, None) => Ok(Json(state.expire_deathmatch(&id).await?)),
        (false, Some(_)) => Err(ApiError::NotHost),
    }
}

// --- Swipes and votes ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwipeBody {
    activity_id: String,
    decision: SwipeDecision,
    #[serde(default)]
    activity_name: String,
    #[serde(default)]
    rating: Option<f32>,
}

#[derive(Debug, Serialize)]
struct SwipeResponse {
    session: Session,
    /// Set when the benchmark was met but the deathmatch could not start yet
    #[serde(skip_serializing_if = "Option::is_none")]
    deferred: Option<ErrorBody>,
}

async fn record_swipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SwipeBody>,
) -> Result<Json<SwipeResponse>, ApiError> {
    let participant_id = require_participant(&headers)?;
    let outcome = state
        .record_swipe_with(
            &id,
            SwipeRequest {
                participant_id,
                activity_id: body.activity_id,
                decision: body.decision,
                activity_name: body.activity_name,
                rating: body.rating,
            },
        )
        .await?;

    Ok(Json(SwipeResponse {
        session: outcome.session,
        deferred: outcome.deferred.as_ref().map(ErrorBody::from_turbo),
    }))
}

#[derive(Debug, Deserialize)]
struct VoteBody {
    choice: Choice,
}

async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<VoteBody>,
) -> Result<Json<Session>, ApiError> {
    let participant_id = require_participant(&headers)?;
    Ok(Json(state.vote(&id, &participant_id, body.choice).await?))
}

// --- Progress and history ---

async fn benchmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BenchmarkReport>, ApiError> {
    Ok(Json(state.benchmark(&id).await?))
}

async fn events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TurboEvent>>, ApiError> {
    // 404 for unknown sessions rather than an empty log
    state.get_session(&id).await?;
    let events = state.history().session_events(&id).await?;
    Ok(Json(events))
}
