//! Mapping of engine errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use leaderboard::{db::StoreError, sync::SyncError, tournament::TournamentError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler's result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn tournament_status(err: &TournamentError) -> StatusCode {
    match err {
        TournamentError::EntryWindowClosed { .. } | TournamentError::NotEligible { .. } => {
            StatusCode::FORBIDDEN
        }
        TournamentError::AlreadyEnrolled(_)
        | TournamentError::CapacityExceeded(_)
        | TournamentError::NotAdmitting(_) => StatusCode::CONFLICT,
        TournamentError::UserNotFound(_)
        | TournamentError::TournamentNotFound(_)
        | TournamentError::ParticipantNotFound(_) => StatusCode::NOT_FOUND,
        TournamentError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        TournamentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Metric label for an admission rejection
pub fn rejection_label(err: &TournamentError) -> &'static str {
    match err {
        TournamentError::EntryWindowClosed { .. } => "window_closed",
        TournamentError::NotEligible { .. } => "not_eligible",
        TournamentError::AlreadyEnrolled(_) => "already_enrolled",
        TournamentError::CapacityExceeded(_) | TournamentError::NotAdmitting(_) => "full",
        TournamentError::UserNotFound(_) => "unknown_user",
        _ => "error",
    }
}

pub fn tournament_error(err: TournamentError) -> ApiError {
    let status = tournament_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Tournament operation failed");
    }
    api_error(status, err.client_message())
}

pub fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => api_error(StatusCode::CONFLICT, "Record already exists"),
        StoreError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "Record not found"),
        StoreError::Unavailable(_) | StoreError::Timeout(_) => {
            tracing::error!(error = %err, "Store unavailable");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
        }
        StoreError::Database(_) => {
            tracing::error!(error = %err, "Database error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub fn sync_error(err: SyncError) -> ApiError {
    match err {
        SyncError::StoreUnavailable(_) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Durable store unavailable, nothing was drained",
        ),
    }
}
