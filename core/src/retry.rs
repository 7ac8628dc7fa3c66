use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;

/// Retry policy for generation calls.
///
/// `max_attempts` counts every call, not just the retries: the default of 3
/// means one initial attempt plus at most two retries. The wait before retry
/// `n` (1-based) is `initial_backoff_ms * backoff_multiplier^(n-1)`, so the
/// defaults wait 1s and then 2s.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// The full sequence of waits this policy can insert between attempts.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut waits = Vec::new();
        let mut backoff_ms = self.initial_backoff_ms as f64;
        for _ in 1..self.max_attempts {
            waits.push(Duration::from_millis(backoff_ms as u64));
            backoff_ms *= self.backoff_multiplier;
        }
        waits
    }
}

/// Runs `operation` until it succeeds, fails terminally, or uses up
/// `config.max_attempts` calls. Backoff waits race against `cancel`, and a
/// cancelled token is also honored before each attempt.
///
/// Terminal errors pass through unchanged. When the attempt budget runs out
/// the last error is wrapped in [`GenerationError::ExhaustedRetries`].
pub(crate) async fn run_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0usize;
    let mut backoff_ms = config.initial_backoff_ms as f64;
    loop {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(GenerationError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => err,
        };
        if attempt >= config.max_attempts {
            return Err(GenerationError::ExhaustedRetries {
                attempts: attempt,
                source: Box::new(err),
            });
        }
        tracing::debug!(
            attempt,
            backoff_ms,
            error = %err,
            "generation attempt failed; backing off"
        );
        wait_with_cancel(cancel, Duration::from_millis(backoff_ms as u64)).await?;
        backoff_ms *= config.backoff_multiplier;
    }
}

async fn wait_with_cancel(
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), GenerationError> {
    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = cancel.cancelled() => Err(GenerationError::Cancelled),
    }
}
