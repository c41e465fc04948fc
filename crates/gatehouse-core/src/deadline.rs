//! Deadlines for token verification and storage transactions.

use std::time::Duration;

use tracing::warn;

use crate::error::{GatehouseError, GatehouseResult};

/// Run `fut` to completion or fail with a retryable
/// [`GatehouseError::Timeout`] once `limit` elapses.
pub async fn with_deadline<T, F>(operation: &str, limit: Duration, fut: F) -> GatehouseResult<T>
where
    F: Future<Output = GatehouseResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, limit_ms = limit.as_millis() as u64, "deadline exceeded");
            Err(GatehouseError::Timeout {
                operation: operation.to_string(),
            })
        }
    }
}
