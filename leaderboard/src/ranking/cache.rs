//! Registry of live tournament leaderboards.

use super::ranked_set::{RankedEntry, RankedSet};
use crate::{tournament::TournamentId, user::UserId};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

type SharedSet = Arc<RwLock<RankedSet<UserId>>>;

/// Live read/write surface for tournament rankings.
///
/// Creation and eviction of a tournament's set take the registry write lock.
/// Score upserts and reads hold the registry read lock for their whole
/// duration and lock only the tournament's own set, so concurrent writers to
/// different tournaments never contend on a set, and an eviction waits for
/// in-flight upserts to land before removing the set. An upsert that arrives
/// after an eviction starts a fresh set.
#[derive(Default)]
pub struct LeaderboardCache {
    boards: RwLock<HashMap<TournamentId, SharedSet>>,
}

impl LeaderboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user's score, creating the tournament's set on first use
    pub async fn upsert(&self, tournament_id: TournamentId, user_id: UserId, score: i64) {
        log::debug!(
            "Leaderboard {}: upserting user {} with score {}",
            tournament_id,
            user_id,
            score
        );

        {
            let boards = self.boards.read().await;
            if let Some(set) = boards.get(&tournament_id) {
                set.write().await.upsert(user_id, score);
                return;
            }
        }

        let mut boards = self.boards.write().await;
        let set = boards.entry(tournament_id).or_default().clone();
        // Registry write lock is still held, nobody else can see this set yet
        set.write().await.upsert(user_id, score);
    }

    /// Top `n` entries, empty when the tournament has no live leaderboard
    pub async fn top(&self, tournament_id: TournamentId, n: usize) -> Vec<RankedEntry<UserId>> {
        let boards = self.boards.read().await;
        match boards.get(&tournament_id) {
            Some(set) => set.read().await.top_n(n),
            None => Vec::new(),
        }
    }

    pub async fn rank_of(&self, tournament_id: TournamentId, user_id: UserId) -> Option<usize> {
        let boards = self.boards.read().await;
        let set = boards.get(&tournament_id)?;
        set.read().await.rank_of(&user_id)
    }

    /// Full ordered snapshot of a tournament's leaderboard
    pub async fn snapshot(&self, tournament_id: TournamentId) -> Option<Vec<RankedEntry<UserId>>> {
        let boards = self.boards.read().await;
        let set = boards.get(&tournament_id)?;
        Some(set.read().await.all())
    }

    /// Remove a tournament's leaderboard and return its ordered entries
    ///
    /// The set leaves the registry under the write lock, so exactly one
    /// caller receives it. Upserts that arrive afterwards start a fresh set.
    pub async fn take(&self, tournament_id: TournamentId) -> Option<Vec<RankedEntry<UserId>>> {
        let removed = self.boards.write().await.remove(&tournament_id)?;
        let mut set = removed.write().await;
        let entries = set.all();
        set.clear();
        log::debug!(
            "Leaderboard {} taken with {} entries",
            tournament_id,
            entries.len()
        );
        Some(entries)
    }

    /// Remove a tournament's leaderboard entirely
    ///
    /// Returns `true` if a leaderboard was present.
    pub async fn evict(&self, tournament_id: TournamentId) -> bool {
        let removed = self.boards.write().await.remove(&tournament_id);
        match removed {
            Some(set) => {
                set.write().await.clear();
                log::debug!("Leaderboard {} evicted", tournament_id);
                true
            }
            None => false,
        }
    }

    /// Every tournament with a live leaderboard
    pub async fn all_keys(&self) -> Vec<TournamentId> {
        self.boards.read().await.keys().copied().collect()
    }

    pub async fn contains(&self, tournament_id: TournamentId) -> bool {
        self.boards.read().await.contains_key(&tournament_id)
    }

    /// Number of live leaderboards
    pub async fn len(&self) -> usize {
        self.boards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.boards.read().await.is_empty()
    }

    /// Number of members in one tournament's leaderboard
    pub async fn member_count(&self, tournament_id: TournamentId) -> usize {
        let boards = self.boards.read().await;
        match boards.get(&tournament_id) {
            Some(set) => set.read().await.len(),
            None => 0,
        }
    }
}
