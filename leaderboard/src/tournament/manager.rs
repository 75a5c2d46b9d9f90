//! Tournament manager for daily capacity-bounded tournaments.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::clock::{Clock, SystemClock};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    FinishAllSummary, FinishFailure, LifecycleConfig, NewTournament, Participant, Tournament,
    TournamentId,
};
use crate::db::{StoreError, TournamentRepository, UserRepository};
use crate::ranking::{LeaderboardCache, RankedEntry};
use crate::sync::{DrainOutcome, SyncCoordinator};
use crate::user::{User, UserId};

/// Tournament manager
///
/// Owns admission, scoring and finishing. The live leaderboards are shared
/// with the [`SyncCoordinator`], which performs the payout when a tournament
/// is finished.
pub struct TournamentManager {
    users: Arc<dyn UserRepository>,
    tournaments: Arc<dyn TournamentRepository>,
    cache: Arc<LeaderboardCache>,
    coordinator: SyncCoordinator,
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
    /// Serializes tournament creation within this process
    creation_lock: Mutex<()>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(
        users: Arc<dyn UserRepository>,
        tournaments: Arc<dyn TournamentRepository>,
        cache: Arc<LeaderboardCache>,
        coordinator: SyncCoordinator,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            users,
            tournaments,
            cache,
            coordinator,
            config,
            clock: Arc::new(SystemClock),
            creation_lock: Mutex::new(()),
        }
    }

    /// Replace the wall clock, e.g. with a [`FixedClock`](super::FixedClock)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<LeaderboardCache> {
        &self.cache
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn ensure_entries_open(&self) -> TournamentResult<()> {
        let now = self.clock.now();
        if self.config.entries_closed_at(now) {
            return Err(TournamentError::EntryWindowClosed {
                cutoff: self.config.cutoff_for(now),
            });
        }
        Ok(())
    }

    /// Return today's admitting tournament, creating one if needed
    pub async fn find_or_create_admitting(&self) -> TournamentResult<Tournament> {
        self.ensure_entries_open()?;
        let now = self.clock.now();

        if let Some(tournament) = self.tournaments.find_admitting(now).await? {
            return Ok(tournament);
        }

        let _guard = self.creation_lock.lock().await;

        // Another caller may have created one while we waited
        if let Some(tournament) = self.tournaments.find_admitting(now).await? {
            return Ok(tournament);
        }

        let tournament = self
            .tournaments
            .create_tournament(NewTournament::daily(now, self.config.capacity))
            .await?;

        log::info!(
            "Created tournament {} ({}) with {} seats",
            tournament.name,
            tournament.id,
            tournament.capacity
        );
        Ok(tournament)
    }

    /// Admit a user into a specific tournament
    pub async fn admit(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Participant> {
        self.ensure_entries_open()?;

        let tournament = self
            .tournaments
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;
        if !tournament.is_active {
            return Err(TournamentError::NotAdmitting(tournament_id));
        }

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))?;

        if let Some(existing) = self.tournaments.find_active_participation(user_id).await? {
            return Err(TournamentError::AlreadyEnrolled(existing.tournament_id));
        }

        if !self.config.is_eligible(user.level, user.coins) {
            return Err(TournamentError::NotEligible {
                level: user.level,
                balance: user.coins,
            });
        }

        let Some(seats_taken) = self.tournaments.try_reserve_seat(tournament_id).await? else {
            return Err(TournamentError::CapacityExceeded(tournament_id));
        };

        match self.users.debit_balance(user_id, self.config.entry_cost).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.release_seat(tournament_id).await;
                let balance = match self.users.get_user(user_id).await {
                    Ok(Some(current)) => current.coins,
                    _ => user.coins,
                };
                return Err(TournamentError::NotEligible {
                    level: user.level,
                    balance,
                });
            }
            Err(e) => {
                self.release_seat(tournament_id).await;
                return Err(e.into());
            }
        }

        let participant = match self
            .tournaments
            .create_participant(tournament_id, user_id, i64::from(user.level))
            .await
        {
            Ok(participant) => participant,
            Err(e) => {
                self.release_seat(tournament_id).await;
                self.refund_entry(user_id).await;
                return Err(match e {
                    StoreError::Conflict(_) => TournamentError::AlreadyEnrolled(tournament_id),
                    other => other.into(),
                });
            }
        };

        self.cache
            .upsert(tournament_id, user_id, participant.score)
            .await;

        log::info!(
            "User {} admitted to tournament {} ({}/{})",
            user_id,
            tournament_id,
            seats_taken,
            tournament.capacity
        );
        if seats_taken >= tournament.capacity {
            log::info!("Tournament {} is now full", tournament_id);
        }

        Ok(participant)
    }

    async fn release_seat(&self, tournament_id: TournamentId) {
        if let Err(e) = self.tournaments.release_seat(tournament_id).await {
            log::error!("Failed to release seat in tournament {}: {}", tournament_id, e);
        }
    }

    async fn refund_entry(&self, user_id: UserId) {
        if let Err(e) = self
            .users
            .increment_balance(user_id, self.config.entry_cost)
            .await
        {
            log::error!("Failed to refund entry cost to user {}: {}", user_id, e);
        }
    }

    /// Enter a user into today's tournament
    ///
    /// Lost seat races are retried against a fresh admitting tournament up to
    /// `seat_attempts` times.
    pub async fn enter_tournament(&self, user_id: UserId) -> TournamentResult<Tournament> {
        let attempts = self.config.seat_attempts.max(1);
        let mut attempt = 1;

        loop {
            let tournament = self.find_or_create_admitting().await?;
            match self.admit(tournament.id, user_id).await {
                Ok(_) => {
                    let refreshed = self.tournaments.get_tournament(tournament.id).await?;
                    return Ok(refreshed.unwrap_or(tournament));
                }
                Err(e @ (TournamentError::CapacityExceeded(_) | TournamentError::NotAdmitting(_)))
                    if attempt < attempts =>
                {
                    log::debug!(
                        "User {} lost a seat race (attempt {}/{}): {}",
                        user_id,
                        attempt,
                        attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Add one point to the user's score in their active tournament
    pub async fn update_score(&self, user_id: UserId) -> TournamentResult<i64> {
        let participation = self
            .tournaments
            .find_active_participation(user_id)
            .await?
            .ok_or(TournamentError::ParticipantNotFound(user_id))?;
        let tournament_id = participation.tournament_id;

        let score = self
            .tournaments
            .increment_participant_score(tournament_id, user_id, 1)
            .await?
            .ok_or(TournamentError::ParticipantNotFound(user_id))?;

        self.cache.upsert(tournament_id, user_id, score).await;
        Ok(score)
    }

    /// Close a tournament and pay out its leaderboard
    ///
    /// Finishing an already finished tournament is a no-op: its leaderboard
    /// was evicted by the first drain, so nothing is paid twice.
    pub async fn finish_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<DrainOutcome> {
        if self.tournaments.get_tournament(tournament_id).await?.is_none() {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }

        if self.tournaments.finish_tournament(tournament_id).await? {
            log::info!("Tournament {} finished", tournament_id);
        } else {
            log::debug!("Tournament {} was already finished", tournament_id);
        }

        Ok(self.coordinator.drain_tournament(tournament_id).await?)
    }

    /// Finish every active tournament
    ///
    /// Each tournament is finished independently; failures are collected in
    /// the summary. Only a failure to list the active tournaments is an error.
    pub async fn finish_all_tournaments(&self) -> TournamentResult<FinishAllSummary> {
        let active = self.tournaments.list_tournaments(true).await?;
        let mut summary = FinishAllSummary::default();

        for tournament in active {
            match self.finish_tournament(tournament.id).await {
                Ok(outcome) => {
                    summary.finished.push(tournament.id);
                    summary.drained.push(outcome);
                }
                Err(e) => {
                    log::error!("Failed to finish tournament {}: {}", tournament.id, e);
                    summary.failed.push(FinishFailure {
                        tournament_id: tournament.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Finished {} tournaments ({} failed)",
            summary.finished.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Live leaderboard, empty when the tournament has none
    pub async fn leaderboard(
        &self,
        tournament_id: TournamentId,
        limit: usize,
    ) -> Vec<RankedEntry<UserId>> {
        self.cache.top(tournament_id, limit).await
    }

    /// 1-based rank of a user in a tournament
    ///
    /// Served from the live leaderboard, or computed from durable scores when
    /// the tournament has no live leaderboard (for example after it finished).
    pub async fn rank_of(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
    ) -> TournamentResult<usize> {
        if let Some(rank) = self.cache.rank_of(tournament_id, user_id).await {
            return Ok(rank);
        }

        let participant = self
            .tournaments
            .get_participant(tournament_id, user_id)
            .await?
            .ok_or(TournamentError::ParticipantNotFound(user_id))?;
        let higher = self
            .tournaments
            .count_participants_above(tournament_id, participant.score)
            .await?;

        Ok(usize::try_from(higher).unwrap_or(usize::MAX).saturating_add(1))
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.tournaments
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    pub async fn list_tournaments(&self, active_only: bool) -> TournamentResult<Vec<Tournament>> {
        Ok(self.tournaments.list_tournaments(active_only).await?)
    }

    /// Tournament entrants ordered by level, optionally within one country
    pub async fn global_leaderboard(
        &self,
        country: Option<&str>,
        limit: i64,
    ) -> TournamentResult<Vec<User>> {
        Ok(self.users.top_competitors(country, limit).await?)
    }

    /// Reload live leaderboards from durable participant scores
    ///
    /// Returns the number of entries loaded.
    pub async fn rebuild_cache(&self) -> TournamentResult<usize> {
        let participants = self.tournaments.active_participants().await?;
        let count = participants.len();

        for participant in participants {
            self.cache
                .upsert(participant.tournament_id, participant.user_id, participant.score)
                .await;
        }

        log::info!(
            "Rebuilt leaderboard cache: {} entries across {} tournaments",
            count,
            self.cache.len().await
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::sync::SyncConfig;
    use crate::tournament::FixedClock;
    use crate::user::NewUser;
    use chrono::{TimeZone, Utc};

    fn manager_at(hour: u32) -> (Arc<InMemoryStore>, TournamentManager) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(LeaderboardCache::new());
        let coordinator = SyncCoordinator::new(store.clone(), cache.clone(), SyncConfig::default());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap(),
        ));
        let manager = TournamentManager::new(
            store.clone(),
            store.clone(),
            cache,
            coordinator,
            LifecycleConfig::default(),
        )
        .with_clock(clock);
        (store, manager)
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_admitting_tournament() {
        let (_store, manager) = manager_at(9);
        let first = manager.find_or_create_admitting().await.unwrap();
        let second = manager.find_or_create_admitting().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.capacity, 35);
    }

    #[tokio::test]
    async fn test_entries_close_after_cutoff() {
        let (_store, manager) = manager_at(20);
        let err = manager.find_or_create_admitting().await.unwrap_err();
        assert!(matches!(err, TournamentError::EntryWindowClosed { .. }));
    }

    #[tokio::test]
    async fn test_update_score_requires_participation() {
        let (store, manager) = manager_at(9);
        let user = store.create_user(NewUser::named("solo")).await.unwrap();
        let err = manager.update_score(user.id).await.unwrap_err();
        assert!(matches!(err, TournamentError::ParticipantNotFound(id) if id == user.id));
    }

    #[tokio::test]
    async fn test_initial_score_is_user_level() {
        let (store, manager) = manager_at(9);
        let user = store
            .create_user(NewUser::named("lvl").with_level(14))
            .await
            .unwrap();

        let tournament = manager.enter_tournament(user.id).await.unwrap();
        let board = manager.leaderboard(tournament.id, 10).await;
        assert_eq!(board[0].score, 14);
        assert_eq!(manager.update_score(user.id).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_finish_unknown_tournament() {
        let (_store, manager) = manager_at(9);
        let err = manager
            .finish_tournament(uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::TournamentNotFound(_)));
    }
}
