//! Structured logging configuration.
//!
//! The subscriber also receives records emitted through the `log` facade, so
//! the engine crate's logs land in the same output with the same filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use lb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed API request
pub fn log_api_request(request_id: &str, method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if status_code >= 500 {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

/// Log the result of a scheduled or on-demand sync pass
pub fn log_sync_pass(trigger: &str, drained: usize, paid: usize, failures: usize, duration_ms: u64) {
    if failures > 0 {
        tracing::warn!(
            trigger = trigger,
            drained = drained,
            paid = paid,
            failures = failures,
            duration_ms = duration_ms,
            "Sync pass completed with failed reward writes"
        );
    } else {
        tracing::info!(
            trigger = trigger,
            drained = drained,
            paid = paid,
            duration_ms = duration_ms,
            "Sync pass completed"
        );
    }
}
