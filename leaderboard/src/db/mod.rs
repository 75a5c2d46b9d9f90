//! Durable storage: PostgreSQL connection pooling and repository adapters.
//!
//! The engine depends only on the [`UserRepository`] and
//! [`TournamentRepository`] traits. [`Database`] owns the sqlx pool the
//! PostgreSQL adapters share, and [`InMemoryStore`] backs tests and the
//! server's in-memory mode.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

pub mod config;
pub mod errors;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use repository::{PgTournamentRepository, PgUserRepository, TournamentRepository, UserRepository};
pub use timeouts::{DEFAULT_WRITE_TIMEOUT, with_timeout};

const SCHEMA: &str = include_str!("../../migrations/0001_create_tables.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use leaderboard::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), leaderboard::db::StoreError> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     db.apply_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Shared handle to the connection pool
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    pub fn users(&self) -> PgUserRepository {
        PgUserRepository::new(self.pool.clone())
    }

    pub fn tournaments(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn apply_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(self.pool.as_ref()).await?;
        log::info!("Database schema is up to date");
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
