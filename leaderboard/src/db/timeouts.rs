//! Deadline wrappers for durable store operations.

use super::errors::{StoreError, StoreResult};
use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Default deadline for a single durable write (5 seconds)
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store operation, failing with [`StoreError::Timeout`] past `duration`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let result = with_timeout(Duration::from_millis(200), async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: StoreResult<()> = with_timeout(Duration::from_millis(200), async {
            Err(StoreError::NotFound("user".into()))
        })
        .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_millis(50)));
    }
}
