//! Outcomes of drain and sync passes.

use serde::Serialize;

use crate::{tournament::TournamentId, user::UserId};

/// Which durable write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    Balance,
    Level,
}

/// A reward write that did not land
#[derive(Debug, Clone, Serialize)]
pub struct RewardFailure {
    pub user_id: UserId,
    pub rank: usize,
    pub kind: WriteKind,
    pub reason: String,
}

/// Result of draining one tournament's leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct DrainOutcome {
    pub tournament_id: TournamentId,
    /// Entries in the snapshot that was paid out
    pub entries: usize,
    /// Users whose balance increment landed
    pub paid: usize,
    /// Users whose level increment landed
    pub leveled: usize,
    pub failures: Vec<RewardFailure>,
    /// Whether a live leaderboard was removed at the end of the drain
    pub evicted: bool,
}

impl DrainOutcome {
    pub fn empty(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            entries: 0,
            paid: 0,
            leveled: 0,
            failures: Vec::new(),
            evicted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a full sync pass, one outcome per drained tournament
///
/// Outcomes are in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub drained: Vec<DrainOutcome>,
}

impl SyncReport {
    pub fn failure_count(&self) -> usize {
        self.drained.iter().map(|d| d.failures.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.drained.iter().all(DrainOutcome::is_clean)
    }

    pub fn paid(&self) -> usize {
        self.drained.iter().map(|d| d.paid).sum()
    }

    pub fn outcome_for(&self, tournament_id: TournamentId) -> Option<&DrainOutcome> {
        self.drained.iter().find(|d| d.tournament_id == tournament_id)
    }
}
