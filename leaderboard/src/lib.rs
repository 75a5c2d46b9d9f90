//! # Leaderboard
//!
//! Engine for daily, capacity-bounded tournaments with live leaderboards.
//!
//! Users enter today's tournament, accumulate score, and are ranked in near
//! real time. When a tournament closes, the top finishers are paid from a
//! fixed reward table and the live leaderboard is retired.
//!
//! ## Core Modules
//!
//! - [`ranking`]: score-ordered sets and the registry of live leaderboards
//! - [`rewards`]: rank to reward table
//! - [`tournament`]: admission, scoring and finishing
//! - [`sync`]: bounded worker pool that pays out and evicts leaderboards
//! - [`db`]: durable store traits with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use leaderboard::ranking::RankedSet;
//!
//! let mut set = RankedSet::new();
//! set.upsert("alice", 50);
//! set.upsert("bob", 40);
//! assert_eq!(set.rank_of(&"bob"), Some(2));
//! ```

pub mod db;
pub mod ranking;
pub mod rewards;
pub mod sync;
pub mod tournament;
pub mod user;

pub use ranking::{LeaderboardCache, RankedEntry, RankedSet};
pub use rewards::{Payout, RewardPolicy, reward_for_rank};
pub use sync::{SyncConfig, SyncCoordinator, SyncReport};
pub use tournament::{TournamentError, TournamentManager};
pub use user::{NewUser, User, UserId};
