//! Leaderboard handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use leaderboard::{tournament::TournamentId, user::User, user::UserId};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    errors::{ApiError, tournament_error},
};

/// Entries returned when no limit is given, and the most ever returned
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    /// Requested limit clamped to `1..=MAX_LIMIT`
    pub fn resolve(&self) -> usize {
        self.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct StandingEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct StandingsResponse {
    pub tournament_id: TournamentId,
    pub entries: Vec<StandingEntry>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub rank: usize,
}

/// Live standings, highest score first.
///
/// Ranks are positions in the list, which is also the order rewards are paid
/// in. A tournament without a live leaderboard returns an empty list.
pub async fn tournament_leaderboard(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Query(query): Query<LimitQuery>,
) -> Json<StandingsResponse> {
    let entries = state
        .manager
        .leaderboard(tournament_id, query.resolve())
        .await
        .into_iter()
        .enumerate()
        .map(|(index, entry)| StandingEntry {
            rank: index + 1,
            user_id: entry.member,
            score: entry.score,
        })
        .collect();

    Json(StandingsResponse {
        tournament_id,
        entries,
    })
}

/// One user's rank; tied scores share a rank
pub async fn tournament_rank(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
) -> Result<Json<RankResponse>, ApiError> {
    let rank = state
        .manager
        .rank_of(user_id, tournament_id)
        .await
        .map_err(tournament_error)?;
    Ok(Json(RankResponse {
        tournament_id,
        user_id,
        rank,
    }))
}

/// Tournament entrants ordered by level
pub async fn global_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    competitors(&state, None, &query).await
}

pub async fn country_leaderboard(
    State(state): State<AppState>,
    Path(country): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    competitors(&state, Some(&country), &query).await
}

async fn competitors(
    state: &AppState,
    country: Option<&str>,
    query: &LimitQuery,
) -> Result<Json<Vec<User>>, ApiError> {
    let limit = i64::try_from(query.resolve()).unwrap_or(i64::MAX);
    state
        .manager
        .global_leaderboard(country, limit)
        .await
        .map(Json)
        .map_err(tournament_error)
}
