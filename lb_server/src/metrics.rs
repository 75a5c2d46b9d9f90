//! Prometheus metrics for monitoring leaderboard server health.
//!
//! Metrics are exposed in Prometheus text format for scraping by monitoring
//! systems. Recording is a no-op until [`init_metrics`] installs the exporter.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Tournament Metrics**: Admissions by outcome, finished tournaments
//! - **Sync Metrics**: Passes, drained leaderboards, failed reward writes

use leaderboard::sync::SyncReport;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Record an admission attempt, labelled `admitted` or by rejection reason.
pub fn admissions_total(outcome: &'static str) {
    metrics::counter!("tournament_admissions_total", "outcome" => outcome).increment(1);
}

pub fn tournaments_finished_total(count: usize) {
    metrics::counter!("tournaments_finished_total").increment(count as u64);
}

/// Set current number of live leaderboards.
pub fn live_leaderboards(count: usize) {
    metrics::gauge!("live_leaderboards").set(count as f64);
}

// ============================================================================
// Sync Metrics
// ============================================================================

/// Record a completed sync pass.
pub fn sync_pass(trigger: &'static str, report: &SyncReport, duration_ms: f64) {
    metrics::counter!("sync_passes_total", "trigger" => trigger, "result" => "ok").increment(1);
    metrics::counter!("sync_leaderboards_drained_total").increment(report.drained.len() as u64);
    metrics::counter!("sync_reward_failures_total").increment(report.failure_count() as u64);
    metrics::histogram!("sync_pass_duration_ms", "trigger" => trigger).record(duration_ms);
}

/// Record a sync pass abandoned because the store was unreachable.
pub fn sync_pass_aborted(trigger: &'static str) {
    metrics::counter!("sync_passes_total", "trigger" => trigger, "result" => "aborted")
        .increment(1);
}

/// Record failed reward writes observed outside a full sync pass.
pub fn reward_failures(count: usize) {
    metrics::counter!("sync_reward_failures_total").increment(count as u64);
}
