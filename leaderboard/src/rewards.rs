//! Rank-dependent tournament rewards.
//!
//! The coin table is applied once per finished leaderboard:
//!
//! | rank    | coins |
//! |---------|-------|
//! | 1       | 5000  |
//! | 2       | 3000  |
//! | 3       | 2000  |
//! | 4 - 10  | 1000  |
//! | other   | 0     |
//!
//! Ranks 1 through 10 additionally earn a one-step level increase. Nothing in
//! this module touches storage.

use serde::Serialize;

/// Ranks at or below this earn a level increase
pub const LEVEL_UP_CUTOFF: usize = 10;

/// Coins awarded for a final 1-based rank
pub fn reward_for_rank(rank: usize) -> i64 {
    match rank {
        1 => 5000,
        2 => 3000,
        3 => 2000,
        4..=10 => 1000,
        _ => 0,
    }
}

/// Whether a final rank earns a level increase
pub fn earns_level_up(rank: usize) -> bool {
    (1..=LEVEL_UP_CUTOFF).contains(&rank)
}

/// Everything a single final rank earns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub rank: usize,
    pub coins: i64,
    pub level_up: bool,
}

impl Payout {
    pub fn is_empty(&self) -> bool {
        self.coins == 0 && !self.level_up
    }
}

/// Reward policy consulted by the sync coordinator
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardPolicy;

impl RewardPolicy {
    pub fn standard() -> Self {
        Self
    }

    pub fn payout(&self, rank: usize) -> Payout {
        Payout {
            rank,
            coins: reward_for_rank(rank),
            level_up: earns_level_up(rank),
        }
    }
}
