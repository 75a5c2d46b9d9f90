//! Reward synchronization between the live leaderboards and durable storage.
//!
//! A sync pass drains every live leaderboard: the leaderboard is removed from
//! the cache and its ordered entries are paid out through the
//! [`RewardPolicy`](crate::rewards::RewardPolicy) as durable balance and level
//! writes. Only one drain can claim a given leaderboard. A
//! bounded pool of workers shares the queue of tournaments and the pass
//! returns once every worker has finished.

pub mod coordinator;
pub mod errors;
pub mod report;

pub use coordinator::{SyncConfig, SyncCoordinator};
pub use errors::SyncError;
pub use report::{DrainOutcome, RewardFailure, SyncReport, WriteKind};
