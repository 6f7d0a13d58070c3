//! Retry utilities with exponential backoff.
//!
//! Provides bounded retry for transient collaborator failures using the
//! `backon` crate. Callers decide what happens once retries are exhausted;
//! story reclamation, for example, logs and swallows blob-delete failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use plaza::reliability::retry::{retry_anyhow, RetryConfig};
//!
//! let removed = retry_anyhow(
//!     RetryConfig::quick(),
//!     "blob_delete",
//!     || async { blobs.delete(&blob).await },
//! ).await;
//! ```

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config for quick operations (fewer retries, shorter delays).
    ///
    /// Used for blob deletes on the request path, where a slow retry loop
    /// would hold up the caller.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            factor: 2.0,
        }
    }

    /// A config that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::quick()
        }
    }

    /// Set maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Build the exponential backoff strategy.
    fn build_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay.max(self.initial_delay))
            .with_max_times(self.max_retries as usize)
            .with_factor(self.factor)
            .with_jitter()
    }
}

/// Retry an async operation that returns `anyhow::Result`.
///
/// Only errors classified by [`is_transient_error`] are retried; anything
/// else is returned immediately.
pub async fn retry_anyhow<F, Fut, T>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let backoff = config.build_backoff();
    let max_retries = config.max_retries;

    let mut attempt = 0u32;
    let notify = |err: &anyhow::Error, dur: Duration| {
        attempt += 1;
        warn!(
            operation = operation_name,
            attempt = attempt,
            max_retries = max_retries,
            next_delay_ms = dur.as_millis() as u64,
            error = %err,
            "Operation failed, will retry"
        );
    };

    operation
        .retry(backoff)
        .when(is_transient_error)
        .notify(notify)
        .await
}

/// Determine if an error is transient and worth retrying.
///
/// I/O errors anywhere in the chain are classified by kind. Other errors
/// fall back to message inspection for timeouts and unavailability, which
/// is how networked blob stores usually surface transient failures.
pub fn is_transient_error(error: &anyhow::Error) -> bool {
    for cause in error.chain() {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            let transient = matches!(
                io.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::TimedOut
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::ResourceBusy
            );
            debug!(kind = ?io.kind(), transient, "Classified I/O error");
            return transient;
        }
    }

    let msg = error.to_string().to_lowercase();
    if msg.contains("timed out") || msg.contains("timeout") {
        debug!("Transient error detected: timeout");
        return true;
    }
    if msg.contains("unavailable")
        || msg.contains("connection refused")
        || msg.contains("connection reset")
        || msg.contains("try again")
    {
        debug!("Transient error detected: collaborator unavailable");
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::quick().with_initial_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_transient_classification() {
        let io = anyhow::Error::new(std::io::Error::from(ErrorKind::TimedOut));
        assert!(is_transient_error(&io));

        let io = anyhow::Error::new(std::io::Error::from(ErrorKind::PermissionDenied))
            .context("Failed to delete blob: stories/a.jpg");
        assert!(!is_transient_error(&io));

        assert!(is_transient_error(&anyhow::anyhow!("blob store temporarily unavailable")));
        assert!(!is_transient_error(&anyhow::anyhow!("Blob key cannot contain '..'")));
    }

    #[test]
    fn test_none_disables_retries() {
        assert_eq!(RetryConfig::none().max_retries, 0);
        assert_eq!(RetryConfig::quick().with_max_retries(5).max_retries, 5);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_anyhow(fast(), "flaky", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("service unavailable");
                }
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: anyhow::Result<()> = retry_anyhow(fast(), "down", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("service unavailable")
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: anyhow::Result<()> = retry_anyhow(fast(), "invalid", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("Blob key cannot be empty")
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
