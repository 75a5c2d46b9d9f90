//! Repository traits over the durable store.
//!
//! The engine only talks to storage through these traits, so the PostgreSQL
//! implementations below and the in-memory store in [`super::memory`] are
//! interchangeable. Increments are single-statement updates so that each user
//! or tournament row is modified atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use crate::tournament::{NewTournament, Participant, Tournament, TournamentId};
use crate::user::{NewUser, User, UserId};

/// User record operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Find user by ID
    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Debit `amount` only if the balance covers it
    ///
    /// Returns the new balance, or `None` when the user is missing or short.
    async fn debit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>>;

    /// Add `amount` to the user's balance
    async fn increment_balance(&self, user_id: UserId, amount: i64) -> StoreResult<()>;

    /// Add `delta` to the user's level
    async fn increment_level(&self, user_id: UserId, delta: i32) -> StoreResult<()>;

    /// Users who have entered any tournament, highest level first
    async fn top_competitors(&self, country: Option<&str>, limit: i64) -> StoreResult<Vec<User>>;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// Tournament and participant operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn create_tournament(&self, new_tournament: NewTournament) -> StoreResult<Tournament>;

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// An active tournament with free seats whose window covers `now`
    async fn find_admitting(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>>;

    /// Newest first
    async fn list_tournaments(&self, active_only: bool) -> StoreResult<Vec<Tournament>>;

    /// Take a seat with a single conditional increment
    ///
    /// Returns the new participant count, or `None` if the tournament is
    /// inactive, missing, or already at capacity.
    async fn try_reserve_seat(&self, tournament_id: TournamentId) -> StoreResult<Option<i32>>;

    /// Give back a seat taken by [`TournamentRepository::try_reserve_seat`]
    async fn release_seat(&self, tournament_id: TournamentId) -> StoreResult<()>;

    /// Mark inactive; returns `false` if it was already finished
    async fn finish_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool>;

    async fn create_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        score: i64,
    ) -> StoreResult<Participant>;

    /// The user's seat in any active tournament
    async fn find_active_participation(&self, user_id: UserId) -> StoreResult<Option<Participant>>;

    async fn get_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<Participant>>;

    /// Add `delta` to a participant's score, returning the new score
    async fn increment_participant_score(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        delta: i64,
    ) -> StoreResult<Option<i64>>;

    /// Participants of a tournament scoring strictly above `score`
    async fn count_participants_above(
        &self,
        tournament_id: TournamentId,
        score: i64,
    ) -> StoreResult<i64>;

    /// Every participant of every active tournament
    async fn active_participants(&self) -> StoreResult<Vec<Participant>>;
}

const USER_COLUMNS: &str = "id, username, country, coins, level, created_at";

const TOURNAMENT_COLUMNS: &str =
    "id, name, starts_at, ends_at, is_active, participant_count, capacity, created_at, finished_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        country: row.get("country"),
        coins: row.get("coins"),
        level: row.get("level"),
        created_at: row.get("created_at"),
    }
}

fn tournament_from_row(row: &PgRow) -> Tournament {
    Tournament {
        id: row.get("id"),
        name: row.get("name"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        is_active: row.get("is_active"),
        participant_count: row.get("participant_count"),
        capacity: row.get("capacity"),
        created_at: row.get("created_at"),
        finished_at: row.get("finished_at"),
    }
}

fn participant_from_row(row: &PgRow) -> Participant {
    Participant {
        tournament_id: row.get("tournament_id"),
        user_id: row.get("user_id"),
        score: row.get("score"),
        joined_at: row.get("joined_at"),
    }
}

/// PostgreSQL implementation of [`UserRepository`]
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = new_user.into_user(Uuid::new_v4(), Utc::now());
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, username, country, coins, level)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.country)
        .bind(user.coins)
        .bind(user.level)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user_from_row(&row))
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn debit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>> {
        // Check and update in one statement so concurrent debits cannot overdraw
        let row = sqlx::query(
            "UPDATE users
             SET coins = coins - $1
             WHERE id = $2 AND coins >= $1
             RETURNING coins",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| r.get("coins")))
    }

    async fn increment_balance(&self, user_id: UserId, amount: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET coins = coins + $1 WHERE id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn increment_level(&self, user_id: UserId, delta: i32) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET level = level + $1 WHERE id = $2")
            .bind(delta)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn top_competitors(&self, country: Option<&str>, limit: i64) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             WHERE EXISTS (SELECT 1 FROM tournament_participants p WHERE p.user_id = u.id)
               AND ($1::TEXT IS NULL OR u.country = $1)
             ORDER BY u.level DESC, u.id
             LIMIT $2"
        ))
        .bind(country)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

/// PostgreSQL implementation of [`TournamentRepository`]
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
}

impl PgTournamentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_tournament(&self, new_tournament: NewTournament) -> StoreResult<Tournament> {
        let row = sqlx::query(&format!(
            "INSERT INTO tournaments (id, name, starts_at, ends_at, is_active, participant_count, capacity)
             VALUES ($1, $2, $3, $4, TRUE, 0, $5)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(new_tournament.id)
        .bind(&new_tournament.name)
        .bind(new_tournament.window.starts_at)
        .bind(new_tournament.window.ends_at)
        .bind(new_tournament.capacity)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(tournament_from_row(&row))
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn find_admitting(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE is_active AND participant_count < capacity
               AND starts_at <= $1 AND ends_at >= $1
             ORDER BY created_at
             LIMIT 1"
        ))
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn list_tournaments(&self, active_only: bool) -> StoreResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE is_active OR NOT $1
             ORDER BY starts_at DESC, created_at DESC"
        ))
        .bind(active_only)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(tournament_from_row).collect())
    }

    async fn try_reserve_seat(&self, tournament_id: TournamentId) -> StoreResult<Option<i32>> {
        let row = sqlx::query(
            "UPDATE tournaments
             SET participant_count = participant_count + 1
             WHERE id = $1 AND is_active AND participant_count < capacity
             RETURNING participant_count",
        )
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| r.get("participant_count")))
    }

    async fn release_seat(&self, tournament_id: TournamentId) -> StoreResult<()> {
        sqlx::query(
            "UPDATE tournaments
             SET participant_count = participant_count - 1
             WHERE id = $1 AND participant_count > 0",
        )
        .bind(tournament_id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn finish_tournament(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tournaments SET is_active = FALSE, finished_at = NOW()
             WHERE id = $1 AND is_active",
        )
        .bind(tournament_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        score: i64,
    ) -> StoreResult<Participant> {
        let row = sqlx::query(
            "INSERT INTO tournament_participants (tournament_id, user_id, score)
             VALUES ($1, $2, $3)
             RETURNING tournament_id, user_id, score, joined_at",
        )
        .bind(tournament_id)
        .bind(user_id)
        .bind(score)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(participant_from_row(&row))
    }

    async fn find_active_participation(&self, user_id: UserId) -> StoreResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT p.tournament_id, p.user_id, p.score, p.joined_at
             FROM tournament_participants p
             JOIN tournaments t ON t.id = p.tournament_id
             WHERE p.user_id = $1 AND t.is_active
             ORDER BY p.joined_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(participant_from_row))
    }

    async fn get_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT tournament_id, user_id, score, joined_at
             FROM tournament_participants
             WHERE tournament_id = $1 AND user_id = $2",
        )
        .bind(tournament_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(participant_from_row))
    }

    async fn increment_participant_score(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let row = sqlx::query(
            "UPDATE tournament_participants
             SET score = score + $1
             WHERE tournament_id = $2 AND user_id = $3
             RETURNING score",
        )
        .bind(delta)
        .bind(tournament_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| r.get("score")))
    }

    async fn count_participants_above(
        &self,
        tournament_id: TournamentId,
        score: i64,
    ) -> StoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS higher FROM tournament_participants
             WHERE tournament_id = $1 AND score > $2",
        )
        .bind(tournament_id)
        .bind(score)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("higher"))
    }

    async fn active_participants(&self) -> StoreResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT p.tournament_id, p.user_id, p.score, p.joined_at
             FROM tournament_participants p
             JOIN tournaments t ON t.id = p.tournament_id
             WHERE t.is_active",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(participant_from_row).collect())
    }
}
