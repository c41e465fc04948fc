//! Transaction execution with deadlines and optimistic-conflict retries.

use std::time::Duration;

use gatehouse_core::deadline::with_deadline;
use gatehouse_core::error::{GatehouseError, GatehouseResult};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DbError;

/// Bounds applied to every multi-statement transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Deadline for one transition including retries (default: 5 s).
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Retries after a failure with no domain explanation (default: 5).
    pub max_retries: u32,
    /// Linear backoff step between retries (default: 20 ms).
    #[serde(with = "millis")]
    pub retry_backoff: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 5,
            retry_backoff: Duration::from_millis(20),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Execute a transaction until it commits or fails for a known reason.
///
/// `attempt` runs one `BEGIN … COMMIT` block. When it fails, the error
/// is first matched against tagged `THROW`s and unique indexes; failing
/// that, `diagnose` re-reads the state the transaction depended on to
/// explain the failure. A failure nothing explains is treated as an
/// optimistic conflict and retried; once `max_retries` is spent it
/// surfaces as the retryable `Timeout`.
pub(crate) async fn run<A, AF, D, DF>(
    config: &TransactionConfig,
    operation: &str,
    attempt: A,
    diagnose: D,
) -> GatehouseResult<()>
where
    A: Fn() -> AF,
    AF: Future<Output = Result<(), DbError>>,
    D: Fn() -> DF,
    DF: Future<Output = Result<Option<DbError>, DbError>>,
{
    with_deadline(operation, config.timeout, async {
        let mut retries = 0u32;
        loop {
            let err = match attempt().await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if let Some(known) = err.classify() {
                return Err(known.into());
            }
            if let Some(cause) = diagnose().await? {
                return Err(cause.into());
            }
            if retries >= config.max_retries {
                // Still contended: the caller may try again.
                warn!(operation, retries, error = %err, "transaction gave up after retries");
                return Err(GatehouseError::Timeout {
                    operation: operation.to_string(),
                });
            }

            retries += 1;
            debug!(operation, retries, error = %err, "transaction failed, retrying");
            tokio::time::sleep(config.retry_backoff * retries).await;
        }
    })
    .await
}
