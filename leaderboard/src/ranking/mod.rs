//! In-memory ranking structures.
//!
//! - [`RankedSet`]: one tournament's score-ordered members
//! - [`LeaderboardCache`]: registry of live sets keyed by tournament

pub mod cache;
pub mod ranked_set;

pub use cache::LeaderboardCache;
pub use ranked_set::{RankedEntry, RankedSet};
