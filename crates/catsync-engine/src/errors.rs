//! Run error model and retry backoff policy helpers.

use std::future::Future;
use std::time::Duration;

use catsync_state::StateError;
use catsync_types::error::{BackoffClass, ClientError};

const BACKOFF_FAST_BASE_MS: u64 = 100;
const BACKOFF_NORMAL_BASE_MS: u64 = 1_000;
const BACKOFF_SLOW_BASE_MS: u64 = 5_000;
const BACKOFF_MAX_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// SyncRunError — categorised errors that abort a run
// ---------------------------------------------------------------------------

/// Error that aborts a synchronization run.
///
/// Per-resource failures never surface here; they are contained as
/// `Failed`/`Skipped` outcomes in the run statistics. `Remote` wraps a
/// remote-call failure that exhausted its retries at page scope; `State`
/// wraps a checkpoint store failure (a version conflict here means a
/// concurrent run and is always fatal); `Infrastructure` wraps host-side
/// defects (task panics, poisoned locks).
#[derive(Debug)]
pub enum SyncRunError {
    /// Remote platform error with retry metadata.
    Remote(ClientError),
    /// Checkpoint store failure.
    State(StateError),
    /// Host-side failure (task panic, poisoned lock, etc.)
    Infrastructure(anyhow::Error),
}

impl std::fmt::Display for SyncRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(e) => write!(f, "{e}"),
            Self::State(e) => write!(f, "{e}"),
            Self::Infrastructure(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyncRunError {}

impl From<ClientError> for SyncRunError {
    fn from(e: ClientError) -> Self {
        Self::Remote(e)
    }
}

impl From<StateError> for SyncRunError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<anyhow::Error> for SyncRunError {
    fn from(e: anyhow::Error) -> Self {
        Self::Infrastructure(e)
    }
}

impl SyncRunError {
    /// Whether this run abort was caused by a concurrent run writing the
    /// same checkpoint.
    #[must_use]
    pub fn is_checkpoint_conflict(&self) -> bool {
        matches!(self, Self::State(StateError::VersionConflict { .. }))
    }
}

/// Compute retry delay based on error hints and attempt number.
pub(crate) fn compute_backoff(err: &ClientError, attempt: u32) -> Duration {
    // If the platform specified a retry_after, use it
    if let Some(ms) = err.retry_after_ms {
        return Duration::from_millis(ms);
    }

    // Exponential backoff based on backoff_class
    let base_ms: u64 = match err.backoff_class {
        BackoffClass::Fast => BACKOFF_FAST_BASE_MS,
        BackoffClass::Normal => BACKOFF_NORMAL_BASE_MS,
        BackoffClass::Slow => BACKOFF_SLOW_BASE_MS,
    };

    let delay_ms = base_ms.saturating_mul(2u64.pow(attempt.saturating_sub(1)));
    Duration::from_millis(delay_ms.min(BACKOFF_MAX_MS))
}

/// Run a remote call, retrying retryable errors with backoff.
///
/// Bounded by `max_retries` additional attempts; the terminal error is
/// returned unchanged once attempts are exhausted or the error is not
/// retryable.
pub(crate) async fn retry_remote<T, F, Fut>(
    max_retries: u32,
    operation: &str,
    mut call: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable && attempt <= max_retries => {
                let delay = compute_backoff(&err, attempt);
                #[allow(clippy::cast_possible_truncation)]
                // Safety: delay.as_millis() is always well under u64::MAX
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    operation,
                    delay_ms,
                    category = %err.category,
                    code = %err.code,
                    "Retryable remote error, will retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_types::error::ErrorCategory;
    use std::sync::atomic::{AtomicU32, Ordering};

    // -----------------------------------------------------------------------
    // SyncRunError tests
    // -----------------------------------------------------------------------

    #[test]
    fn checkpoint_conflict_detection() {
        let err = SyncRunError::State(StateError::VersionConflict {
            resource_type: "product".into(),
        });
        assert!(err.is_checkpoint_conflict());

        let other = SyncRunError::Remote(ClientError::version_conflict("CONFLICT", "busy"));
        assert!(!other.is_checkpoint_conflict());
    }

    #[test]
    fn display_passes_through_inner_error() {
        let err = SyncRunError::Remote(ClientError::rate_limit("THROTTLED", "slow down", None));
        let msg = err.to_string();
        assert!(msg.contains("rate_limit"));
        assert!(msg.contains("THROTTLED"));
    }

    #[test]
    fn from_anyhow_is_infrastructure() {
        let err: SyncRunError = anyhow::anyhow!("stats mutex poisoned").into();
        assert!(matches!(err, SyncRunError::Infrastructure(_)));
    }

    // -----------------------------------------------------------------------
    // compute_backoff tests
    // -----------------------------------------------------------------------

    #[test]
    fn backoff_normal_doubles() {
        let err = ClientError::transient_network("TIMEOUT", "timed out");
        assert_eq!(compute_backoff(&err, 1), Duration::from_millis(1000));
        assert_eq!(compute_backoff(&err, 2), Duration::from_millis(2000));
        assert_eq!(compute_backoff(&err, 3), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_slow_for_rate_limit() {
        let err = ClientError::rate_limit("THROTTLED", "slow down", None);
        assert_eq!(compute_backoff(&err, 1), Duration::from_millis(5000));
    }

    #[test]
    fn backoff_respects_retry_after() {
        let err = ClientError::rate_limit("THROTTLED", "slow down", Some(7500));
        assert_eq!(compute_backoff(&err, 1), Duration::from_millis(7500));
        assert_eq!(compute_backoff(&err, 5), Duration::from_millis(7500));
    }

    #[test]
    fn backoff_capped_at_60s() {
        let err = ClientError::transient_network("TIMEOUT", "timed out");
        assert_eq!(compute_backoff(&err, 20), Duration::from_millis(60_000));
    }

    // -----------------------------------------------------------------------
    // retry_remote tests
    // -----------------------------------------------------------------------

    /// Retryable error with a 1ms retry-after hint, to keep tests fast.
    fn quick_transient() -> ClientError {
        ClientError::rate_limit("THROTTLED", "slow down", Some(1))
    }

    #[tokio::test]
    async fn retry_remote_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = retry_remote(3, "fetch page", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(quick_transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_remote_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ClientError> = retry_remote(2, "fetch page", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(quick_transient()) }
        })
        .await;
        assert_eq!(result.unwrap_err().category, ErrorCategory::RateLimit);
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_remote_does_not_retry_validation() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ClientError> = retry_remote(3, "create", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::validation("DUPLICATE_SLUG", "slug taken")) }
        })
        .await;
        assert_eq!(result.unwrap_err().category, ErrorCategory::Validation);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
