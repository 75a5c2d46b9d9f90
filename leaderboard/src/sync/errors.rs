//! Sync error types.

use crate::db::StoreError;
use thiserror::Error;

/// Errors that abort a whole sync pass
///
/// Individual write failures never abort a pass, they are reported in
/// [`DrainOutcome::failures`](super::DrainOutcome::failures) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The durable store failed its pre-pass health check
    #[error("Durable store unavailable: {0}")]
    StoreUnavailable(StoreError),
}
