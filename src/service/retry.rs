//! Fixed-delay retry bound to a cancellation signal.
//!
//! Uses `backon` with a constant backoff. The whole retry loop, including the
//! sleep between attempts, is raced against a `CancellationToken` so a request
//! deadline or server shutdown stops further attempts immediately.

use backon::{ConstantBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::SummaryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` is the total number of tries; zero is treated as one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.attempts as usize - 1)
    }
}

/// Run `op` until it succeeds, returns a non-retryable error, exhausts the
/// policy, or `cancel` fires. The last error is returned on exhaustion.
pub async fn retry_until_cancelled<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &'static str,
    op: F,
) -> Result<T, SummaryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SummaryError>>,
{
    let attempts = op
        .retry(policy.backoff())
        .when(SummaryError::is_retryable)
        .notify(|err: &SummaryError, dur: Duration| {
            warn!(operation, error = %err, "retrying after {:?}", dur);
        });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SummaryError::Cancelled),
        res = attempts => res,
    }
}
