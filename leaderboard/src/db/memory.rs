//! In-process store implementing both repository traits.
//!
//! Used by the test suites and by the server's `--in-memory` mode. Every
//! operation runs under a single mutex, which gives the conditional updates
//! the same atomicity the SQL statements have. Faults can be injected per
//! user or for the whole store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::repository::{TournamentRepository, UserRepository};
use crate::tournament::{NewTournament, Participant, Tournament, TournamentId};
use crate::user::{NewUser, User, UserId};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    tournaments: HashMap<TournamentId, Tournament>,
    participants: HashMap<(TournamentId, UserId), Participant>,
    unavailable: bool,
    failing_balance: HashSet<UserId>,
    failing_level: HashSet<UserId>,
    write_delay: Option<Duration>,
}

impl State {
    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the whole store offline (`false`) or back online
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    /// Make every balance increment for `user_id` fail
    pub fn fail_balance_updates_for(&self, user_id: UserId) {
        self.lock().failing_balance.insert(user_id);
    }

    /// Make every level increment for `user_id` fail
    pub fn fail_level_updates_for(&self, user_id: UserId) {
        self.lock().failing_level.insert(user_id);
    }

    /// Delay balance and level increments, for exercising write deadlines
    pub fn delay_writes(&self, delay: Option<Duration>) {
        self.lock().write_delay = delay;
    }

    /// Insert a fully formed tournament, bypassing creation defaults
    pub fn insert_tournament(&self, tournament: Tournament) {
        self.lock().tournaments.insert(tournament.id, tournament);
    }

    pub fn participant_count(&self, tournament_id: TournamentId) -> usize {
        self.lock()
            .participants
            .keys()
            .filter(|(tid, _)| *tid == tournament_id)
            .count()
    }

    async fn pause_for_write(&self) {
        let delay = self.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut state = self.lock();
        state.check_available()?;

        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict(format!(
                "username {}",
                new_user.username
            )));
        }

        let user = new_user.into_user(Uuid::new_v4(), Utc::now());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn debit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>> {
        let mut state = self.lock();
        state.check_available()?;

        match state.users.get_mut(&user_id) {
            Some(user) if user.coins >= amount => {
                user.coins -= amount;
                Ok(Some(user.coins))
            }
            _ => Ok(None),
        }
    }

    async fn increment_balance(&self, user_id: UserId, amount: i64) -> StoreResult<()> {
        self.pause_for_write().await;
        let mut state = self.lock();
        state.check_available()?;

        if state.failing_balance.contains(&user_id) {
            return Err(StoreError::Unavailable(format!(
                "balance write rejected for {user_id}"
            )));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.coins += amount;
        Ok(())
    }

    async fn increment_level(&self, user_id: UserId, delta: i32) -> StoreResult<()> {
        self.pause_for_write().await;
        let mut state = self.lock();
        state.check_available()?;

        if state.failing_level.contains(&user_id) {
            return Err(StoreError::Unavailable(format!(
                "level write rejected for {user_id}"
            )));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.level += delta;
        Ok(())
    }

    async fn top_competitors(&self, country: Option<&str>, limit: i64) -> StoreResult<Vec<User>> {
        let state = self.lock();
        state.check_available()?;

        let entered: HashSet<UserId> = state.participants.keys().map(|(_, uid)| *uid).collect();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| entered.contains(&u.id))
            .filter(|u| country.is_none_or(|c| u.country == c))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.level.cmp(&a.level).then(a.id.cmp(&b.id)));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().check_available()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryStore {
    async fn create_tournament(&self, new_tournament: NewTournament) -> StoreResult<Tournament> {
        let mut state = self.lock();
        state.check_available()?;

        if state.tournaments.contains_key(&new_tournament.id) {
            return Err(StoreError::Conflict(format!(
                "tournament {}",
                new_tournament.id
            )));
        }

        let tournament = Tournament {
            id: new_tournament.id,
            name: new_tournament.name,
            starts_at: new_tournament.window.starts_at,
            ends_at: new_tournament.window.ends_at,
            is_active: true,
            participant_count: 0,
            capacity: new_tournament.capacity,
            created_at: Utc::now(),
            finished_at: None,
        };
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.tournaments.get(&tournament_id).cloned())
    }

    async fn find_admitting(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>> {
        let state = self.lock();
        state.check_available()?;

        Ok(state
            .tournaments
            .values()
            .filter(|t| t.is_active && t.participant_count < t.capacity && t.covers(now))
            .min_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn list_tournaments(&self, active_only: bool) -> StoreResult<Vec<Tournament>> {
        let state = self.lock();
        state.check_available()?;

        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|t| t.is_active || !active_only)
            .cloned()
            .collect();
        tournaments.sort_by(|a, b| {
            b.starts_at
                .cmp(&a.starts_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(tournaments)
    }

    async fn try_reserve_seat(&self, tournament_id: TournamentId) -> StoreResult<Option<i32>> {
        let mut state = self.lock();
        state.check_available()?;

        match state.tournaments.get_mut(&tournament_id) {
            Some(t) if t.is_active && t.participant_count < t.capacity => {
                t.participant_count += 1;
                Ok(Some(t.participant_count))
            }
            _ => Ok(None),
        }
    }

    async fn release_seat(&self, tournament_id: TournamentId) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_available()?;

        if let Some(t) = state.tournaments.get_mut(&tournament_id) {
            t.participant_count = (t.participant_count - 1).max(0);
        }
        Ok(())
    }

    async fn finish_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        let mut state = self.lock();
        state.check_available()?;

        match state.tournaments.get_mut(&tournament_id) {
            Some(t) if t.is_active => {
                t.is_active = false;
                t.finished_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        score: i64,
    ) -> StoreResult<Participant> {
        let mut state = self.lock();
        state.check_available()?;

        if !state.tournaments.contains_key(&tournament_id) {
            return Err(StoreError::NotFound(format!("tournament {tournament_id}")));
        }
        if state.participants.contains_key(&(tournament_id, user_id)) {
            return Err(StoreError::Conflict(format!(
                "participant {user_id} in {tournament_id}"
            )));
        }

        let participant = Participant {
            tournament_id,
            user_id,
            score,
            joined_at: Utc::now(),
        };
        state
            .participants
            .insert((tournament_id, user_id), participant.clone());
        Ok(participant)
    }

    async fn find_active_participation(&self, user_id: UserId) -> StoreResult<Option<Participant>> {
        let state = self.lock();
        state.check_available()?;

        Ok(state
            .participants
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| {
                state
                    .tournaments
                    .get(&p.tournament_id)
                    .is_some_and(|t| t.is_active)
            })
            .max_by_key(|p| p.joined_at)
            .cloned())
    }

    async fn get_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<Participant>> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.participants.get(&(tournament_id, user_id)).cloned())
    }

    async fn increment_participant_score(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut state = self.lock();
        state.check_available()?;

        Ok(state
            .participants
            .get_mut(&(tournament_id, user_id))
            .map(|p| {
                p.score += delta;
                p.score
            }))
    }

    async fn count_participants_above(
        &self,
        tournament_id: TournamentId,
        score: i64,
    ) -> StoreResult<i64> {
        let state = self.lock();
        state.check_available()?;

        let higher = state
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id && p.score > score)
            .count();
        Ok(i64::try_from(higher).unwrap_or(i64::MAX))
    }

    async fn active_participants(&self) -> StoreResult<Vec<Participant>> {
        let state = self.lock();
        state.check_available()?;

        Ok(state
            .participants
            .values()
            .filter(|p| {
                state
                    .tournaments
                    .get(&p.tournament_id)
                    .is_some_and(|t| t.is_active)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_is_conditional() {
        let store = InMemoryStore::new();
        let user = store
            .create_user(NewUser::named("alice").with_coins(600))
            .await
            .unwrap();

        assert_eq!(store.debit_balance(user.id, 500).await.unwrap(), Some(100));
        assert_eq!(store.debit_balance(user.id, 500).await.unwrap(), None);
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().coins, 100);
    }

    #[tokio::test]
    async fn test_reserve_seat_stops_at_capacity() {
        let store = InMemoryStore::new();
        let t = store
            .create_tournament(NewTournament::daily(Utc::now(), 2))
            .await
            .unwrap();

        assert_eq!(store.try_reserve_seat(t.id).await.unwrap(), Some(1));
        assert_eq!(store.try_reserve_seat(t.id).await.unwrap(), Some(2));
        assert_eq!(store.try_reserve_seat(t.id).await.unwrap(), None);

        store.release_seat(t.id).await.unwrap();
        assert_eq!(store.try_reserve_seat(t.id).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_finished_tournament_rejects_seats() {
        let store = InMemoryStore::new();
        let t = store
            .create_tournament(NewTournament::daily(Utc::now(), 35))
            .await
            .unwrap();

        assert!(store.finish_tournament(t.id).await.unwrap());
        assert!(!store.finish_tournament(t.id).await.unwrap());
        assert_eq!(store.try_reserve_seat(t.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = InMemoryStore::new();
        store.create_user(NewUser::named("alice")).await.unwrap();
        let err = store.create_user(NewUser::named("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_offline_store_rejects_everything() {
        let store = InMemoryStore::new();
        store.set_available(false);

        assert!(store.ping().await.unwrap_err().is_unavailable());
        assert!(store.get_user(Uuid::new_v4()).await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_balance_failure() {
        let store = InMemoryStore::new();
        let user = store.create_user(NewUser::named("bob")).await.unwrap();
        store.fail_balance_updates_for(user.id);

        assert!(store.increment_balance(user.id, 100).await.is_err());
        assert!(store.increment_level(user.id, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_top_competitors_only_lists_entrants() {
        let store = InMemoryStore::new();
        let t = store
            .create_tournament(NewTournament::daily(Utc::now(), 35))
            .await
            .unwrap();
        let low = store
            .create_user(NewUser::named("low").with_level(11).with_country("Chile"))
            .await
            .unwrap();
        let high = store
            .create_user(NewUser::named("high").with_level(20).with_country("Peru"))
            .await
            .unwrap();
        store.create_user(NewUser::named("idle").with_level(99)).await.unwrap();

        store.create_participant(t.id, low.id, 11).await.unwrap();
        store.create_participant(t.id, high.id, 20).await.unwrap();

        let global = store.top_competitors(None, 10).await.unwrap();
        assert_eq!(
            global.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![high.id, low.id]
        );

        let chile = store.top_competitors(Some("Chile"), 10).await.unwrap();
        assert_eq!(chile.len(), 1);
        assert_eq!(chile[0].id, low.id);
    }
}
