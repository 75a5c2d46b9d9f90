//! Daily tournament closer.
//!
//! Sleeps until the configured close time, finishes every active tournament,
//! sweeps any leaderboard left behind with a full sync pass, then re-arms for
//! the next day. A pass abandoned because the store is unreachable is picked
//! up again on the next run.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use leaderboard::{
    sync::{SyncError, SyncReport},
    tournament::{FinishAllSummary, TournamentManager},
};
use std::{sync::Arc, time::Duration, time::Instant};
use tokio::task::JoinHandle;

use crate::{logging, metrics};

/// Time from `now` until the next occurrence of `at` (UTC), never zero
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let today = now.date_naive().and_time(at).and_utc();
    let next = if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(1))
}

/// Run one sync pass, recording logs and metrics under `trigger`
pub async fn run_sync_pass(
    manager: &TournamentManager,
    trigger: &'static str,
) -> Result<SyncReport, SyncError> {
    let started = Instant::now();
    let result = manager.coordinator().sync_all().await;
    let elapsed = started.elapsed();

    match &result {
        Ok(report) => {
            metrics::sync_pass(trigger, report, elapsed.as_secs_f64() * 1000.0);
            logging::log_sync_pass(
                trigger,
                report.drained.len(),
                report.paid(),
                report.failure_count(),
                elapsed.as_millis() as u64,
            );
        }
        Err(e) => {
            metrics::sync_pass_aborted(trigger);
            tracing::error!(trigger = trigger, error = %e, "Sync pass aborted");
        }
    }
    metrics::live_leaderboards(manager.cache().len().await);
    result
}

/// Finish every active tournament and record the outcome
pub async fn run_finish_all(manager: &TournamentManager) -> Option<FinishAllSummary> {
    match manager.finish_all_tournaments().await {
        Ok(summary) => {
            metrics::tournaments_finished_total(summary.finished.len());
            metrics::reward_failures(summary.reward_failures());
            tracing::info!(
                finished = summary.finished.len(),
                failed = summary.failed.len(),
                reward_failures = summary.reward_failures(),
                "Finished active tournaments"
            );
            Some(summary)
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not list active tournaments");
            None
        }
    }
}

/// Background task that closes the day's tournaments
pub struct DailyCloser {
    manager: Arc<TournamentManager>,
    close_at: NaiveTime,
}

impl DailyCloser {
    pub fn new(manager: Arc<TournamentManager>, close_at: NaiveTime) -> Self {
        Self { manager, close_at }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        loop {
            let wait = until_next(Utc::now(), self.close_at);
            tracing::info!(
                close_at = %self.close_at,
                wait_secs = wait.as_secs(),
                "Daily closer armed"
            );
            tokio::time::sleep(wait).await;
            self.close_day().await;
        }
    }

    /// Finish today's tournaments, then drain whatever is still live
    pub async fn close_day(&self) {
        run_finish_all(&self.manager).await;
        // Result is already logged and recorded
        let _ = run_sync_pass(&self.manager, "schedule").await;
    }
}
