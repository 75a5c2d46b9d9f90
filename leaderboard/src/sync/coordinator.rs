//! Bounded worker pool that drains live leaderboards into durable storage.

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};

use super::errors::SyncError;
use super::report::{DrainOutcome, RewardFailure, SyncReport, WriteKind};
use crate::db::{DEFAULT_WRITE_TIMEOUT, StoreError, UserRepository, with_timeout};
use crate::ranking::LeaderboardCache;
use crate::rewards::RewardPolicy;
use crate::tournament::TournamentId;
use crate::user::UserId;

/// Default number of concurrent drain workers
pub const DEFAULT_SYNC_WORKERS: usize = 8;

/// Sizing and deadlines for sync passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on concurrently drained tournaments
    pub workers: usize,
    /// Deadline for each durable balance or level write
    pub write_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_SYNC_WORKERS,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Pays out and evicts live leaderboards
#[derive(Clone)]
pub struct SyncCoordinator {
    users: Arc<dyn UserRepository>,
    cache: Arc<LeaderboardCache>,
    policy: RewardPolicy,
    config: SyncConfig,
}

impl SyncCoordinator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<LeaderboardCache>,
        config: SyncConfig,
    ) -> Self {
        Self {
            users,
            cache,
            policy: RewardPolicy::standard(),
            config,
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Drain every live leaderboard
    ///
    /// The store is health-checked first; if it is unreachable the pass is
    /// abandoned before any leaderboard is touched. Otherwise every
    /// tournament is drained by one of at most `workers` tasks and the report
    /// is returned once all of them have finished.
    pub async fn sync_all(&self) -> Result<SyncReport, SyncError> {
        self.ensure_store_reachable().await?;

        let keys = self.cache.all_keys().await;
        if keys.is_empty() {
            log::debug!("Sync pass: no live leaderboards");
            return Ok(SyncReport::default());
        }

        let worker_count = self.config.workers.max(1).min(keys.len());
        log::info!(
            "Sync pass: draining {} leaderboards with {} workers",
            keys.len(),
            worker_count
        );

        let (sender, receiver) = mpsc::channel::<TournamentId>(keys.len());
        for key in keys {
            if sender.send(key).await.is_err() {
                break;
            }
        }
        drop(sender);

        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let coordinator = self.clone();
            let receiver = receiver.clone();
            workers.spawn(async move { coordinator.run_worker(worker_id, receiver).await });
        }

        let mut report = SyncReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcomes) => report.drained.extend(outcomes),
                Err(e) => log::error!("Sync worker terminated abnormally: {}", e),
            }
        }

        log::info!(
            "Sync pass complete: {} leaderboards drained, {} users paid, {} failed writes",
            report.drained.len(),
            report.paid(),
            report.failure_count()
        );
        Ok(report)
    }

    /// Drain a single tournament's leaderboard
    ///
    /// Returns an empty outcome when the tournament has no live leaderboard,
    /// including when another drain already claimed it.
    pub async fn drain_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> Result<DrainOutcome, SyncError> {
        self.ensure_store_reachable().await?;
        Ok(self.drain(tournament_id).await)
    }

    async fn ensure_store_reachable(&self) -> Result<(), SyncError> {
        with_timeout(self.config.write_timeout, self.users.ping())
            .await
            .map_err(|e| {
                log::error!("Sync aborted, durable store unreachable: {}", e);
                SyncError::StoreUnavailable(e)
            })
    }

    async fn run_worker(
        &self,
        worker_id: usize,
        queue: Arc<Mutex<mpsc::Receiver<TournamentId>>>,
    ) -> Vec<DrainOutcome> {
        let mut outcomes = Vec::new();
        loop {
            // The queue lock is released before draining
            let next = queue.lock().await.recv().await;
            let Some(tournament_id) = next else {
                break;
            };
            log::debug!("Sync worker {} draining {}", worker_id, tournament_id);
            outcomes.push(self.drain(tournament_id).await);
        }
        outcomes
    }

    async fn drain(&self, tournament_id: TournamentId) -> DrainOutcome {
        // Claiming the set first means a concurrent drain finds nothing to pay
        let Some(entries) = self.cache.take(tournament_id).await else {
            return DrainOutcome::empty(tournament_id);
        };

        let mut outcome = DrainOutcome::empty(tournament_id);
        outcome.entries = entries.len();
        outcome.evicted = true;

        for (index, entry) in entries.iter().enumerate() {
            let payout = self.policy.payout(index + 1);
            if payout.is_empty() {
                continue;
            }

            if payout.coins > 0 {
                let write = self.users.increment_balance(entry.member, payout.coins);
                if let Err(e) = with_timeout(self.config.write_timeout, write).await {
                    outcome.failures.push(self.failure(
                        tournament_id,
                        entry.member,
                        payout.rank,
                        WriteKind::Balance,
                        e,
                    ));
                    continue;
                }
                outcome.paid += 1;
            }

            if payout.level_up {
                let write = self.users.increment_level(entry.member, 1);
                match with_timeout(self.config.write_timeout, write).await {
                    Ok(()) => outcome.leveled += 1,
                    Err(e) => outcome.failures.push(self.failure(
                        tournament_id,
                        entry.member,
                        payout.rank,
                        WriteKind::Level,
                        e,
                    )),
                }
            }
        }

        log::info!(
            "Drained leaderboard {}: {} entries, {} paid, {} leveled, {} failures",
            tournament_id,
            outcome.entries,
            outcome.paid,
            outcome.leveled,
            outcome.failures.len()
        );
        outcome
    }

    fn failure(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        rank: usize,
        kind: WriteKind,
        error: StoreError,
    ) -> RewardFailure {
        log::warn!(
            "Reward write failed in {} for user {} (rank {}, {:?}): {}",
            tournament_id,
            user_id,
            rank,
            kind,
            error
        );
        RewardFailure {
            user_id,
            rank,
            kind,
            reason: error.to_string(),
        }
    }
}
