//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::NaiveTime;
use leaderboard::{
    db::DatabaseConfig,
    sync::SyncConfig,
    tournament::{
        DEFAULT_CAPACITY, DEFAULT_ENTRY_COST, DEFAULT_ENTRY_CUTOFF_HOUR, DEFAULT_MIN_BALANCE,
        DEFAULT_MIN_LEVEL, LifecycleConfig,
    },
};
use std::{net::SocketAddr, time::Duration};

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Serve from the in-memory store instead of PostgreSQL
    pub in_memory: bool,
    /// Admission rules and tournament sizing
    pub lifecycle: LifecycleConfig,
    /// Reward sync worker pool
    pub sync: SyncConfig,
    /// Daily close scheduling
    pub schedule: ScheduleConfig,
}

/// When the daily closer finishes tournaments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Time of day (UTC) at which every active tournament is finished
    pub close_at: NaiveTime,
    /// Whether the closer runs at all
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            close_at: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory_override` - Forces the in-memory store when `true` (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory_override: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required("SERVER_BIND", DEFAULT_BIND)?,
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let in_memory = in_memory_override || parse_env_or("IN_MEMORY_STORE", false);

        let cutoff_hour: u32 = parse_env_or("ENTRY_CUTOFF_HOUR", DEFAULT_ENTRY_CUTOFF_HOUR);
        let entry_cutoff =
            NaiveTime::from_hms_opt(cutoff_hour, 0, 0).ok_or_else(|| ConfigError::Invalid {
                var: "ENTRY_CUTOFF_HOUR".to_string(),
                reason: format!("{cutoff_hour} is not an hour of the day"),
            })?;

        let lifecycle = LifecycleConfig {
            capacity: parse_env_or("TOURNAMENT_CAPACITY", DEFAULT_CAPACITY),
            entry_cost: parse_env_or("ENTRY_COST", DEFAULT_ENTRY_COST),
            min_level: parse_env_or("ENTRY_MIN_LEVEL", DEFAULT_MIN_LEVEL),
            min_balance: parse_env_or("ENTRY_MIN_BALANCE", DEFAULT_MIN_BALANCE),
            entry_cutoff,
            ..LifecycleConfig::default()
        };

        let sync_defaults = SyncConfig::default();
        let sync = SyncConfig {
            workers: parse_env_or("SYNC_WORKERS", sync_defaults.workers),
            write_timeout: std::env::var("SYNC_WRITE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(sync_defaults.write_timeout),
        };

        let close_hour: u32 = parse_env_or("DAILY_CLOSE_HOUR", 23);
        let close_minute: u32 = parse_env_or("DAILY_CLOSE_MINUTE", 59);
        let close_at = NaiveTime::from_hms_opt(close_hour, close_minute, 0).ok_or_else(|| {
            ConfigError::Invalid {
                var: "DAILY_CLOSE_HOUR".to_string(),
                reason: format!("{close_hour:02}:{close_minute:02} is not a time of day"),
            }
        })?;
        let schedule = ScheduleConfig {
            close_at,
            enabled: parse_env_or("DAILY_CLOSE_ENABLED", true),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            in_memory,
            lifecycle,
            sync,
            schedule,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.capacity <= 0 {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.lifecycle.entry_cost < 0 {
            return Err(ConfigError::Invalid {
                var: "ENTRY_COST".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.lifecycle.min_balance < self.lifecycle.entry_cost {
            return Err(ConfigError::Invalid {
                var: "ENTRY_MIN_BALANCE".to_string(),
                reason: format!(
                    "Must be at least the entry cost ({})",
                    self.lifecycle.entry_cost
                ),
            });
        }

        if self.sync.workers == 0 {
            return Err(ConfigError::Invalid {
                var: "SYNC_WORKERS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.sync.write_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SYNC_WRITE_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Helper to parse a variable that must be valid when present
fn parse_env_required<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("'{raw}' could not be parsed"),
    })
}
