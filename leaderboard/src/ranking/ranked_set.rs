//! Score-ordered member set backing a single tournament leaderboard.

use serde::Serialize;
use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, HashMap},
    hash::Hash,
};

/// A member paired with its score in an ordered view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry<M> {
    pub member: M,
    pub score: i64,
}

/// Ranked container mapping member identity to score.
///
/// Entries are ordered by descending score. Members with equal scores are
/// ordered by ascending member identity, so every ordered view is
/// deterministic regardless of insertion order.
#[derive(Debug, Clone)]
pub struct RankedSet<M> {
    scores: HashMap<M, i64>,
    ordered: BTreeSet<(Reverse<i64>, M)>,
    /// Members per distinct score
    tallies: BTreeMap<Reverse<i64>, usize>,
}

impl<M> Default for RankedSet<M>
where
    M: Ord + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> RankedSet<M>
where
    M: Ord + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            ordered: BTreeSet::new(),
            tallies: BTreeMap::new(),
        }
    }

    /// Insert a member or replace its score
    pub fn upsert(&mut self, member: M, score: i64) {
        match self.scores.insert(member.clone(), score) {
            Some(previous) if previous == score => {}
            Some(previous) => {
                self.ordered.remove(&(Reverse(previous), member.clone()));
                self.untally(previous);
                self.ordered.insert((Reverse(score), member));
                *self.tallies.entry(Reverse(score)).or_default() += 1;
            }
            None => {
                self.ordered.insert((Reverse(score), member));
                *self.tallies.entry(Reverse(score)).or_default() += 1;
            }
        }
    }

    fn untally(&mut self, score: i64) {
        if let Some(count) = self.tallies.get_mut(&Reverse(score)) {
            *count -= 1;
            if *count == 0 {
                self.tallies.remove(&Reverse(score));
            }
        }
    }

    /// Remove a single member, returning its last score
    pub fn remove(&mut self, member: &M) -> Option<i64> {
        let score = self.scores.remove(member)?;
        self.ordered.remove(&(Reverse(score), member.clone()));
        self.untally(score);
        Some(score)
    }

    /// Up to `n` entries in descending score order
    pub fn top_n(&self, n: usize) -> Vec<RankedEntry<M>> {
        self.ordered
            .iter()
            .take(n)
            .map(|(Reverse(score), member)| RankedEntry {
                member: member.clone(),
                score: *score,
            })
            .collect()
    }

    /// 1-based rank: the number of members with a strictly higher score, plus one.
    ///
    /// Members sharing a score share a rank. Cost grows with the number of
    /// distinct scores above the member's, not with the number of members.
    pub fn rank_of(&self, member: &M) -> Option<usize> {
        let score = *self.scores.get(member)?;
        let higher: usize = self
            .tallies
            .range(..Reverse(score))
            .map(|(_, count)| count)
            .sum();
        Some(higher + 1)
    }

    pub fn score_of(&self, member: &M) -> Option<i64> {
        self.scores.get(member).copied()
    }

    /// Owned snapshot of every entry in rank order
    pub fn all(&self) -> Vec<RankedEntry<M>> {
        self.top_n(self.ordered.len())
    }

    pub fn clear(&mut self) {
        self.scores.clear();
        self.ordered.clear();
        self.tallies.clear();
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> RankedSet<&'static str> {
        let mut set = RankedSet::new();
        set.upsert("a", 50);
        set.upsert("b", 40);
        set.upsert("c", 30);
        set
    }

    #[test]
    fn test_top_n_orders_by_descending_score() {
        let set = seeded();
        let top = set.top_n(2);
        assert_eq!(
            top,
            vec![
                RankedEntry { member: "a", score: 50 },
                RankedEntry { member: "b", score: 40 },
            ]
        );
    }

    #[test]
    fn test_top_n_larger_than_set_returns_everything() {
        let set = seeded();
        assert_eq!(set.top_n(100).len(), 3);
        assert!(RankedSet::<u32>::new().top_n(5).is_empty());
    }

    #[test]
    fn test_rank_of() {
        let set = seeded();
        assert_eq!(set.rank_of(&"a"), Some(1));
        assert_eq!(set.rank_of(&"c"), Some(3));
        assert_eq!(set.rank_of(&"zed"), None);
    }

    #[test]
    fn test_upsert_replaces_score() {
        let mut set = seeded();
        set.upsert("c", 99);

        assert_eq!(set.len(), 3);
        assert_eq!(set.rank_of(&"c"), Some(1));
        assert_eq!(set.rank_of(&"a"), Some(2));
        assert_eq!(set.score_of(&"c"), Some(99));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut set = seeded();
        let before = set.all();
        set.upsert("b", 40);
        set.upsert("b", 40);
        assert_eq!(set.all(), before);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_ties_break_by_member_identity() {
        let mut set = RankedSet::new();
        set.upsert(3u32, 10);
        set.upsert(1u32, 10);
        set.upsert(2u32, 10);

        let members: Vec<u32> = set.all().into_iter().map(|e| e.member).collect();
        assert_eq!(members, vec![1, 2, 3]);

        // Tied members share a rank
        assert_eq!(set.rank_of(&3), Some(1));
    }

    #[test]
    fn test_snapshot_is_detached_from_later_mutations() {
        let mut set = seeded();
        let snapshot = set.all();
        set.upsert("d", 1000);
        set.clear();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].member, "a");
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut set = seeded();
        assert_eq!(set.remove(&"b"), Some(40));
        assert_eq!(set.remove(&"b"), None);
        assert_eq!(set.rank_of(&"c"), Some(2));
    }

    #[test]
    fn test_rank_of_counts_tied_scores_above() {
        let mut set = RankedSet::new();
        for member in 0..50u32 {
            set.upsert(member, 90);
        }
        set.upsert(100, 80);
        set.upsert(101, 95);
        assert_eq!(set.rank_of(&100), Some(52));
        assert_eq!(set.rank_of(&7), Some(2));

        // Moving members out of a score bucket updates ranks below it
        for member in 0..10u32 {
            set.upsert(member, 10);
        }
        set.remove(&11);
        assert_eq!(set.rank_of(&100), Some(41));
        assert_eq!(set.rank_of(&3), Some(42));

        set.clear();
        set.upsert(100, 1);
        assert_eq!(set.rank_of(&100), Some(1));
    }
}
