//! Daily tournaments with bounded capacity.
//!
//! This module provides the tournament lifecycle:
//! - Finding or creating today's admitting tournament
//! - Admission with eligibility checks, atomic seat reservation and entry debit
//! - Score updates mirrored into the live leaderboard
//! - Finishing, which pays out and retires the leaderboard
//!
//! A tournament is `Admitting` while it has free seats, `Full` once every
//! seat is taken, and `Finished` after it is closed. Independently of those
//! states, no entries are accepted after the daily cutoff.
//!
//! ## Example
//!
//! ```no_run
//! use leaderboard::db::{Database, DatabaseConfig};
//! use leaderboard::ranking::LeaderboardCache;
//! use leaderboard::sync::{SyncConfig, SyncCoordinator};
//! use leaderboard::tournament::{LifecycleConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let users = Arc::new(db.users());
//!     let cache = Arc::new(LeaderboardCache::new());
//!     let coordinator = SyncCoordinator::new(users.clone(), cache.clone(), SyncConfig::default());
//!     let manager = TournamentManager::new(
//!         users,
//!         Arc::new(db.tournaments()),
//!         cache,
//!         coordinator,
//!         LifecycleConfig::default(),
//!     );
//!
//!     let tournament = manager.find_or_create_admitting().await?;
//!     println!("Admitting into {}", tournament.name);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod errors;
pub mod manager;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    DEFAULT_CAPACITY, DEFAULT_ENTRY_COST, DEFAULT_ENTRY_CUTOFF_HOUR, DEFAULT_MIN_BALANCE,
    DEFAULT_MIN_LEVEL, EntryWindow, FinishAllSummary, FinishFailure, LifecycleConfig, NewTournament, Participant,
    Tournament, TournamentId, TournamentState,
};
