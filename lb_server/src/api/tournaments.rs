//! Tournament entry, scoring, and finishing handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use leaderboard::{
    sync::{DrainOutcome, SyncReport},
    tournament::{FinishAllSummary, Tournament, TournamentId, TournamentState},
    user::UserId,
};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    errors::{ApiError, rejection_label, sync_error, tournament_error},
};
use crate::{metrics, scheduler};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only tournaments that are still running
    #[serde(default)]
    pub active: bool,
}

/// Tournament with its derived lifecycle state
#[derive(Debug, Serialize)]
pub struct TournamentView {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub state: TournamentState,
    pub free_seats: i32,
}

impl From<Tournament> for TournamentView {
    fn from(tournament: Tournament) -> Self {
        Self {
            state: tournament.state(),
            free_seats: tournament.free_seats(),
            tournament,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnterResponse {
    pub message: String,
    pub tournament_id: TournamentId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub participant_count: i32,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub user_id: UserId,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct FinishResponse {
    pub message: String,
    pub outcome: DrainOutcome,
}

pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TournamentView>>, ApiError> {
    let tournaments = state
        .manager
        .list_tournaments(query.active)
        .await
        .map_err(tournament_error)?;
    Ok(Json(tournaments.into_iter().map(TournamentView::from).collect()))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<TournamentView>, ApiError> {
    let tournament = state
        .manager
        .get_tournament(tournament_id)
        .await
        .map_err(tournament_error)?;
    Ok(Json(tournament.into()))
}

/// Enter today's tournament.
///
/// Debits the entry cost and seats the user in the tournament currently
/// admitting, creating one if every tournament is full.
///
/// # Response
///
/// - `200 OK`: seated
/// - `403 Forbidden`: entry window closed or requirements not met
/// - `404 Not Found`: unknown user
/// - `409 Conflict`: already enrolled, or no seat could be obtained
pub async fn enter_tournament(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<EnterResponse>, ApiError> {
    match state.manager.enter_tournament(user_id).await {
        Ok(tournament) => {
            metrics::admissions_total("admitted");
            Ok(Json(EnterResponse {
                message: "Entered tournament".to_string(),
                tournament_id: tournament.id,
                starts_at: tournament.starts_at,
                ends_at: tournament.ends_at,
                participant_count: tournament.participant_count,
            }))
        }
        Err(e) => {
            metrics::admissions_total(rejection_label(&e));
            Err(tournament_error(e))
        }
    }
}

/// Add one point to the user's score in their active tournament
pub async fn update_score(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = state
        .manager
        .update_score(user_id)
        .await
        .map_err(tournament_error)?;
    Ok(Json(ScoreResponse { user_id, score }))
}

/// Finish a tournament and pay out its leaderboard.
///
/// Finishing twice is allowed; the second call drains nothing.
pub async fn finish_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<FinishResponse>, ApiError> {
    let outcome = state
        .manager
        .finish_tournament(tournament_id)
        .await
        .map_err(tournament_error)?;

    metrics::tournaments_finished_total(1);
    metrics::reward_failures(outcome.failures.len());
    metrics::live_leaderboards(state.manager.cache().len().await);

    Ok(Json(FinishResponse {
        message: "Tournament finished".to_string(),
        outcome,
    }))
}

pub async fn finish_all(State(state): State<AppState>) -> Result<Json<FinishAllSummary>, ApiError> {
    let summary = state
        .manager
        .finish_all_tournaments()
        .await
        .map_err(tournament_error)?;

    metrics::tournaments_finished_total(summary.finished.len());
    metrics::reward_failures(summary.reward_failures());
    metrics::live_leaderboards(state.manager.cache().len().await);

    Ok(Json(summary))
}

/// Drain every live leaderboard now.
///
/// Returns `503 Service Unavailable` without draining anything when the
/// durable store is unreachable.
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<SyncReport>, ApiError> {
    scheduler::run_sync_pass(&state.manager, "manual")
        .await
        .map(Json)
        .map_err(sync_error)
}
