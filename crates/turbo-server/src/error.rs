//! API error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use turbo_coordination::events::HistoryError;
use turbo_coordination::TurboError;

/// Error returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Turbo(#[from] TurboError),

    #[error("History unavailable: {0}")]
    History(#[from] HistoryError),

    #[error("Only the session host may choose the winner")]
    NotHost,
}

/// JSON body of an error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl ErrorBody {
    pub fn from_turbo(err: &TurboError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Turbo(err) => match err {
                TurboError::NotFound(_) => StatusCode::NOT_FOUND,
                TurboError::InvalidTransition { .. }
                | TurboError::InsufficientCandidates { .. }
                | TurboError::DeadlineNotReached { .. } => StatusCode::CONFLICT,
                TurboError::MissingParticipant => StatusCode::UNAUTHORIZED,
                TurboError::UnknownParticipant(_) => StatusCode::FORBIDDEN,
                TurboError::InvalidGroupSize(_) => StatusCode::BAD_REQUEST,
                TurboError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                TurboError::Contention { .. } | TurboError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            ApiError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotHost => StatusCode::FORBIDDEN,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Turbo(err) => err.kind(),
            ApiError::History(_) => "history",
            ApiError::NotHost => "not_host",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            debug!(kind = self.kind(), %status, "Request rejected: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
