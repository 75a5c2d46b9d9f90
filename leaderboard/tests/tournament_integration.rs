//! Integration tests for the tournament lifecycle.
//!
//! Tests eligibility, capacity, the daily cutoff, scoring, and finishing
//! against the in-memory store.

use chrono::{TimeZone, Utc};
use leaderboard::db::{InMemoryStore, TournamentRepository, UserRepository};
use leaderboard::ranking::LeaderboardCache;
use leaderboard::sync::{SyncConfig, SyncCoordinator};
use leaderboard::tournament::{
    FixedClock, LifecycleConfig, TournamentError, TournamentManager, TournamentState,
};
use leaderboard::user::{NewUser, User};
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<FixedClock>,
    manager: Arc<TournamentManager>,
}

/// Helper to build a manager over a fresh store, at 10:00 UTC
fn setup() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(LeaderboardCache::new());
    let coordinator = SyncCoordinator::new(store.clone(), cache.clone(), SyncConfig::default());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
    ));
    let manager = TournamentManager::new(
        store.clone(),
        store.clone(),
        cache,
        coordinator,
        LifecycleConfig::default(),
    )
    .with_clock(clock.clone());

    Harness {
        store,
        clock,
        manager: Arc::new(manager),
    }
}

/// Helper to create an eligible user
async fn eligible_user(store: &InMemoryStore, name: &str) -> User {
    store
        .create_user(NewUser::named(name).with_level(10).with_coins(500))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_level_below_threshold_is_not_eligible() {
    let h = setup();
    let user = h
        .store
        .create_user(NewUser::named("low_level").with_level(9).with_coins(5000))
        .await
        .unwrap();

    let err = h.manager.enter_tournament(user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotEligible { level: 9, .. }));
}

#[tokio::test]
async fn test_balance_below_threshold_is_not_eligible() {
    let h = setup();
    let user = h
        .store
        .create_user(NewUser::named("poor").with_level(30).with_coins(499))
        .await
        .unwrap();

    let err = h.manager.enter_tournament(user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotEligible { balance: 499, .. }));

    let unchanged = h.store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(unchanged.coins, 499);
}

#[tokio::test]
async fn test_threshold_user_is_admitted_and_debited() {
    let h = setup();
    let user = eligible_user(&h.store, "edge").await;

    let tournament = h.manager.enter_tournament(user.id).await.unwrap();
    assert_eq!(tournament.participant_count, 1);
    assert_eq!(tournament.state(), TournamentState::Admitting);

    let after = h.store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(after.coins, 0);
}

#[tokio::test]
async fn test_already_enrolled() {
    let h = setup();
    let user = h
        .store
        .create_user(NewUser::named("twice").with_level(10).with_coins(2000))
        .await
        .unwrap();

    let tournament = h.manager.enter_tournament(user.id).await.unwrap();
    let err = h.manager.enter_tournament(user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::AlreadyEnrolled(id) if id == tournament.id));

    let after = h.store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(after.coins, 1500);
}

#[tokio::test]
async fn test_unknown_user() {
    let h = setup();
    let err = h
        .manager
        .enter_tournament(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::UserNotFound(_)));
}

#[tokio::test]
async fn test_entry_after_cutoff_is_refused() {
    let h = setup();
    let user = eligible_user(&h.store, "late").await;

    h.clock
        .set(Utc.with_ymd_and_hms(2026, 3, 2, 19, 0, 1).unwrap());
    let err = h.manager.enter_tournament(user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::EntryWindowClosed { .. }));

    // The cutoff resets with the new day
    h.clock
        .set(Utc.with_ymd_and_hms(2026, 3, 3, 0, 5, 0).unwrap());
    assert!(h.manager.enter_tournament(user.id).await.is_ok());
}

#[tokio::test]
async fn test_full_tournament_rejects_36th_admission() {
    let h = setup();
    let tournament = h.manager.find_or_create_admitting().await.unwrap();

    for i in 0..35 {
        let user = eligible_user(&h.store, &format!("seat{i}")).await;
        h.manager.admit(tournament.id, user.id).await.unwrap();
    }

    let full = h.manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(full.participant_count, 35);
    assert_eq!(full.state(), TournamentState::Full);

    let extra = eligible_user(&h.store, "seat35").await;
    let err = h.manager.admit(tournament.id, extra.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::CapacityExceeded(id) if id == tournament.id));

    // Rejected entrant keeps their coins
    let after = h.store.get_user(extra.id).await.unwrap().unwrap();
    assert_eq!(after.coins, 500);
}

#[tokio::test]
async fn test_entering_after_full_opens_new_tournament() {
    let h = setup();
    let first = h.manager.find_or_create_admitting().await.unwrap();
    for i in 0..35 {
        let user = eligible_user(&h.store, &format!("p{i}")).await;
        h.manager.admit(first.id, user.id).await.unwrap();
    }

    let late = eligible_user(&h.store, "overflow").await;
    let second = h.manager.enter_tournament(late.id).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.participant_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admissions_never_exceed_capacity() {
    let h = setup();
    let tournament = h.manager.find_or_create_admitting().await.unwrap();

    let mut users = Vec::new();
    for i in 0..50 {
        users.push(eligible_user(&h.store, &format!("race{i}")).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let manager = h.manager.clone();
        let tournament_id = tournament.id;
        handles.push(tokio::spawn(async move {
            manager.admit(tournament_id, user.id).await
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(TournamentError::CapacityExceeded(_)) => rejected += 1,
            Err(e) => panic!("unexpected admission error: {e}"),
        }
    }

    assert_eq!(admitted, 35);
    assert_eq!(rejected, 15);
    assert_eq!(h.store.participant_count(tournament.id), 35);
    let full = h.manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(full.participant_count, 35);
}

#[tokio::test]
async fn test_scores_rank_and_finish_payout() {
    let h = setup();
    let tournament = h.manager.find_or_create_admitting().await.unwrap();

    // Levels set the starting scores; score updates add on top
    let target = [("a", 50), ("b", 40), ("c", 30)];
    let mut users = Vec::new();
    for (name, score) in target {
        let user = h
            .store
            .create_user(NewUser::named(name).with_level(10).with_coins(500))
            .await
            .unwrap();
        h.manager.admit(tournament.id, user.id).await.unwrap();
        for _ in 10..score {
            h.manager.update_score(user.id).await.unwrap();
        }
        users.push(user);
    }
    let (a, b, c) = (&users[0], &users[1], &users[2]);

    let top = h.manager.leaderboard(tournament.id, 2).await;
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].member, top[0].score), (a.id, 50));
    assert_eq!((top[1].member, top[1].score), (b.id, 40));
    assert_eq!(h.manager.rank_of(c.id, tournament.id).await.unwrap(), 3);

    let outcome = h.manager.finish_tournament(tournament.id).await.unwrap();
    assert_eq!(outcome.entries, 3);
    assert_eq!(outcome.paid, 3);
    assert_eq!(outcome.leveled, 3);
    assert!(outcome.is_clean());

    for (user, coins) in [(a, 5000), (b, 3000), (c, 2000)] {
        let after = h.store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(after.coins, coins);
        assert_eq!(after.level, 11);
    }

    let finished = h.manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(finished.state(), TournamentState::Finished);
    assert!(h.manager.leaderboard(tournament.id, 10).await.is_empty());

    // Rank still resolves from durable scores after the leaderboard is gone
    assert_eq!(h.manager.rank_of(c.id, tournament.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_finish_twice_pays_once() {
    let h = setup();
    let user = eligible_user(&h.store, "winner").await;
    let tournament = h.manager.enter_tournament(user.id).await.unwrap();

    h.manager.finish_tournament(tournament.id).await.unwrap();
    let again = h.manager.finish_tournament(tournament.id).await.unwrap();
    assert_eq!(again.entries, 0);
    assert_eq!(again.paid, 0);

    let after = h.store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(after.coins, 5000);
    assert_eq!(after.level, 11);
}

#[tokio::test]
async fn test_finished_tournament_is_not_admitting() {
    let h = setup();
    let tournament = h.manager.find_or_create_admitting().await.unwrap();
    h.manager.finish_tournament(tournament.id).await.unwrap();

    let user = eligible_user(&h.store, "after_close").await;
    let err = h.manager.admit(tournament.id, user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotAdmitting(_)));
}

#[tokio::test]
async fn test_finish_all_finishes_every_active_tournament() {
    let h = setup();
    let first = h.manager.find_or_create_admitting().await.unwrap();
    for i in 0..35 {
        let user = eligible_user(&h.store, &format!("fa{i}")).await;
        h.manager.admit(first.id, user.id).await.unwrap();
    }
    let late = eligible_user(&h.store, "fa_late").await;
    let second = h.manager.enter_tournament(late.id).await.unwrap();

    let summary = h.manager.finish_all_tournaments().await.unwrap();
    assert_eq!(summary.finished.len(), 2);
    assert!(summary.failed.is_empty());
    assert!(summary.finished.contains(&first.id));
    assert!(summary.finished.contains(&second.id));

    assert!(h.manager.list_tournaments(true).await.unwrap().is_empty());
    assert_eq!(h.manager.list_tournaments(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rebuild_cache_from_durable_scores() {
    let h = setup();
    let user = eligible_user(&h.store, "restart").await;
    let tournament = h.manager.enter_tournament(user.id).await.unwrap();
    h.manager.update_score(user.id).await.unwrap();

    // A second manager over the same store starts with an empty cache
    let cache = Arc::new(LeaderboardCache::new());
    let coordinator = SyncCoordinator::new(h.store.clone(), cache.clone(), SyncConfig::default());
    let restarted = TournamentManager::new(
        h.store.clone(),
        h.store.clone(),
        cache,
        coordinator,
        LifecycleConfig::default(),
    );
    assert!(restarted.leaderboard(tournament.id, 10).await.is_empty());

    assert_eq!(restarted.rebuild_cache().await.unwrap(), 1);
    let board = restarted.leaderboard(tournament.id, 10).await;
    assert_eq!(board[0].member, user.id);
    assert_eq!(board[0].score, 11);
}

#[tokio::test]
async fn test_global_leaderboard_by_country() {
    let h = setup();
    for (name, level, country) in [("tr1", 15, "Turkey"), ("de1", 20, "Germany"), ("tr2", 12, "Turkey")] {
        let user = h
            .store
            .create_user(
                NewUser::named(name)
                    .with_level(level)
                    .with_coins(500)
                    .with_country(country),
            )
            .await
            .unwrap();
        h.manager.enter_tournament(user.id).await.unwrap();
    }

    let global = h.manager.global_leaderboard(None, 10).await.unwrap();
    assert_eq!(
        global.iter().map(|u| u.level).collect::<Vec<_>>(),
        vec![20, 15, 12]
    );

    let turkey = h.manager.global_leaderboard(Some("Turkey"), 1).await.unwrap();
    assert_eq!(turkey.len(), 1);
    assert_eq!(turkey[0].username, "tr1");

    assert_eq!(h.store.list_tournaments(true).await.unwrap().len(), 1);
}
