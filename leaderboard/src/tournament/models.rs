//! Tournament data models for daily capacity-bounded tournaments.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{sync::DrainOutcome, user::UserId};

/// Tournament ID type
pub type TournamentId = Uuid;

/// Seats per tournament
pub const DEFAULT_CAPACITY: i32 = 35;

/// Coins debited when a user enters a tournament
pub const DEFAULT_ENTRY_COST: i64 = 500;

/// Minimum level required to enter
pub const DEFAULT_MIN_LEVEL: i32 = 10;

/// Minimum coin balance required to enter
pub const DEFAULT_MIN_BALANCE: i64 = 500;

/// Hour (UTC) after which no new entries are accepted for the day
pub const DEFAULT_ENTRY_CUTOFF_HOUR: u32 = 19;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentState {
    /// Active with free seats
    Admitting,
    /// Active with every seat taken
    Full,
    /// Closed; terminal
    Finished,
}

/// A tournament as recorded in durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub participant_count: i32,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn state(&self) -> TournamentState {
        if !self.is_active {
            TournamentState::Finished
        } else if self.participant_count >= self.capacity {
            TournamentState::Full
        } else {
            TournamentState::Admitting
        }
    }

    pub fn free_seats(&self) -> i32 {
        (self.capacity - self.participant_count).max(0)
    }

    /// Whether `now` falls inside the tournament's window
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }
}

/// Fields needed to create a tournament record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTournament {
    pub id: TournamentId,
    pub name: String,
    pub window: EntryWindow,
    pub capacity: i32,
}

impl NewTournament {
    /// A tournament spanning the UTC calendar day of `now`
    pub fn daily(now: DateTime<Utc>, capacity: i32) -> Self {
        let id = Uuid::new_v4();
        let window = EntryWindow::for_day(now.date_naive());
        let short_id = id.simple().to_string();
        Self {
            id,
            name: format!("daily_{}_{}", window.day().format("%Y%m%d"), &short_id[..8]),
            window,
            capacity,
        }
    }
}

/// Open/close window of a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl EntryWindow {
    /// 00:00 through 23:59 UTC of `day`
    pub fn for_day(day: NaiveDate) -> Self {
        let starts_at = day.and_time(NaiveTime::MIN).and_utc();
        let ends_at = starts_at + TimeDelta::hours(23) + TimeDelta::minutes(59);
        Self { starts_at, ends_at }
    }

    pub fn day(&self) -> NaiveDate {
        self.starts_at.date_naive()
    }
}

/// A user's seat in a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub score: i64,
    pub joined_at: DateTime<Utc>,
}

/// Admission rules and sizing for the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub capacity: i32,
    pub entry_cost: i64,
    pub min_level: i32,
    pub min_balance: i64,
    /// Time of day (UTC) after which entries are refused
    pub entry_cutoff: NaiveTime,
    /// Find-or-create retries when a seat race is lost
    pub seat_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            entry_cost: DEFAULT_ENTRY_COST,
            min_level: DEFAULT_MIN_LEVEL,
            min_balance: DEFAULT_MIN_BALANCE,
            entry_cutoff: NaiveTime::from_hms_opt(DEFAULT_ENTRY_CUTOFF_HOUR, 0, 0)
                .unwrap_or(NaiveTime::MIN),
            seat_attempts: 3,
        }
    }
}

impl LifecycleConfig {
    /// Cutoff instant for the UTC day containing `now`
    pub fn cutoff_for(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.date_naive().and_time(self.entry_cutoff).and_utc()
    }

    pub fn entries_closed_at(&self, now: DateTime<Utc>) -> bool {
        now > self.cutoff_for(now)
    }

    pub fn is_eligible(&self, level: i32, coins: i64) -> bool {
        level >= self.min_level && coins >= self.min_balance
    }
}

/// Result of finishing every active tournament
#[derive(Debug, Default, Serialize)]
pub struct FinishAllSummary {
    pub finished: Vec<TournamentId>,
    pub failed: Vec<FinishFailure>,
    /// Drain outcome of each finished tournament
    pub drained: Vec<DrainOutcome>,
}

impl FinishAllSummary {
    pub fn reward_failures(&self) -> usize {
        self.drained.iter().map(|d| d.failures.len()).sum()
    }
}

/// A tournament that could not be finished during a finish-all pass
#[derive(Debug, Serialize)]
pub struct FinishFailure {
    pub tournament_id: TournamentId,
    pub reason: String,
}
