//! HTTP API for the tournament leaderboard server.
//!
//! # Modules
//!
//! - [`users`]: user registration and lookup
//! - [`tournaments`]: entry, scoring, finishing, and manual sync
//! - [`standings`]: live tournament rankings and the level leaderboard
//! - [`errors`]: mapping of engine errors to status codes
//! - [`middleware`]: request IDs, request logging, and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                            - Store and cache health
//! POST /api/v1/users                                      - Register user
//! GET  /api/v1/users/{user_id}                            - Get user
//! GET  /api/v1/tournaments?active=true                    - List tournaments
//! GET  /api/v1/tournaments/{id}                           - Get tournament
//! POST /api/v1/tournaments/enter/{user_id}                - Enter today's tournament
//! PUT  /api/v1/tournaments/update-score/{user_id}         - Add one point
//! POST /api/v1/tournaments/{id}/finish                    - Finish and pay out
//! POST /api/v1/tournaments/finish-all                     - Finish every active tournament
//! POST /api/v1/sync                                       - Run a sync pass now
//! GET  /api/v1/leaderboard/tournament/{id}?limit=N        - Live standings
//! GET  /api/v1/leaderboard/tournament/{id}/rank/{user_id} - One user's rank
//! GET  /api/v1/leaderboard/global?limit=N                 - Entrants by level
//! GET  /api/v1/leaderboard/country/{country}?limit=N      - Entrants by level in a country
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lb_server::api::{AppState, create_router};
//! use leaderboard::{
//!     LeaderboardCache, SyncConfig, SyncCoordinator, TournamentManager,
//!     db::InMemoryStore, tournament::LifecycleConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let cache = Arc::new(LeaderboardCache::new());
//! let coordinator = SyncCoordinator::new(store.clone(), cache.clone(), SyncConfig::default());
//! let manager = TournamentManager::new(
//!     store.clone(),
//!     store.clone(),
//!     cache,
//!     coordinator,
//!     LifecycleConfig::default(),
//! );
//!
//! let app = create_router(AppState::new(Arc::new(manager), store));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod errors;
pub mod standings;
pub mod middleware;
pub mod tournaments;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use leaderboard::{db::UserRepository, tournament::TournamentManager};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// - `manager`: tournament lifecycle and live leaderboards
/// - `users`: durable user records
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(manager: Arc<TournamentManager>, users: Arc<dyn UserRepository>) -> Self {
        Self { manager, users }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .route_layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let users = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user));

    // Literal segments are matched ahead of `{tournament_id}`
    let tournaments = Router::new()
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/finish-all", post(tournaments::finish_all))
        .route(
            "/tournaments/enter/{user_id}",
            post(tournaments::enter_tournament),
        )
        .route(
            "/tournaments/update-score/{user_id}",
            put(tournaments::update_score),
        )
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/finish",
            post(tournaments::finish_tournament),
        );

    let leaderboards = Router::new()
        .route(
            "/leaderboard/tournament/{tournament_id}",
            get(standings::tournament_leaderboard),
        )
        .route(
            "/leaderboard/tournament/{tournament_id}/rank/{user_id}",
            get(standings::tournament_rank),
        )
        .route("/leaderboard/global", get(standings::global_leaderboard))
        .route(
            "/leaderboard/country/{country}",
            get(standings::country_leaderboard),
        );

    Router::new()
        .route("/sync", post(tournaments::trigger_sync))
        .merge(users)
        .merge(tournaments)
        .merge(leaderboards)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the durable store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":true,"live_leaderboards":3,"timestamp":"2026-03-02T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.users.ping().await.is_ok();
    let live_leaderboards = state.manager.cache().len().await;

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "live_leaderboards": live_leaderboards,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
