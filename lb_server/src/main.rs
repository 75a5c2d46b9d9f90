//! Daily tournament leaderboard server.
//!
//! Serves the HTTP API over a PostgreSQL-backed (or in-memory) store and
//! closes the day's tournaments on a schedule.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use lb_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
    scheduler::DailyCloser,
};
use leaderboard::{
    LeaderboardCache, SyncCoordinator, TournamentManager,
    db::{Database, InMemoryStore, TournamentRepository, UserRepository},
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the daily tournament leaderboard server

USAGE:
  lb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Serve from an in-memory store instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address; unset disables metrics
  DATABASE_URL             PostgreSQL connection string
  TOURNAMENT_CAPACITY      Seats per tournament [default: 35]
  ENTRY_CUTOFF_HOUR        UTC hour after which entry closes [default: 19]
  SYNC_WORKERS             Concurrent leaderboard drains [default: 8]
  DAILY_CLOSE_HOUR         UTC hour of the daily close [default: 23]
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.in_memory)?;
    config.validate()?;
    info!(bind = %config.bind, in_memory = config.in_memory, "Starting leaderboard server");

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!(%metrics_bind, "Prometheus exporter listening");
    }

    let (users, tournaments, database): (
        Arc<dyn UserRepository>,
        Arc<dyn TournamentRepository>,
        Option<Database>,
    ) = if config.in_memory {
        info!("Using in-memory store; data is lost on exit");
        let store = Arc::new(InMemoryStore::new());
        let users: Arc<dyn UserRepository> = store.clone();
        let tournaments: Arc<dyn TournamentRepository> = store;
        (users, tournaments, None)
    } else {
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.apply_schema()
            .await
            .context("Failed to apply database schema")?;
        info!("Database connected successfully");
        let users: Arc<dyn UserRepository> = Arc::new(db.users());
        let tournaments: Arc<dyn TournamentRepository> = Arc::new(db.tournaments());
        (users, tournaments, Some(db))
    };

    let cache = Arc::new(LeaderboardCache::new());
    let coordinator = SyncCoordinator::new(users.clone(), cache.clone(), config.sync);
    let manager = Arc::new(TournamentManager::new(
        users.clone(),
        tournaments,
        cache,
        coordinator,
        config.lifecycle.clone(),
    ));

    let restored = manager
        .rebuild_cache()
        .await
        .context("Failed to rebuild leaderboards")?;
    info!(entries = restored, "Live leaderboards restored");

    let closer = config.schedule.enabled.then(|| {
        info!(close_at = %config.schedule.close_at, "Daily closer enabled");
        DailyCloser::new(manager.clone(), config.schedule.close_at).spawn()
    });

    let app = api::create_router(AppState::new(manager, users));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(closer) = closer {
        closer.abort();
    }
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
}
