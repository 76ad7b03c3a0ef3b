use crate::reply::{Oracle, OracleError};
use std::sync::Arc;
use std::time::Duration;

/// Exponential backoff between oracle attempts. Every failure is retryable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. For tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Handle passed into every stage: an oracle plus its retry and time budget.
#[derive(Clone)]
pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl OracleClient {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(15 * 60),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Wall-clock budget for one `invoke`, covering every attempt and backoff sleep.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send `prompt` and return the reply's plain text.
    ///
    /// Never panics; returns an error once retries or the time budget are
    /// exhausted so the caller can choose between a soft and a hard failure.
    pub async fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        match tokio::time::timeout(self.call_timeout, self.invoke_with_retry(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(budget = ?self.call_timeout, "oracle call timed out");
                Err(OracleError::Timeout(self.call_timeout))
            }
        }
    }

    async fn invoke_with_retry(&self, prompt: &str) -> Result<String, OracleError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            tracing::debug!(attempt, prompt_chars = prompt.len(), "prompting oracle");
            let result = match self.oracle.complete(prompt).await {
                Ok(reply) => reply.into_content(),
                Err(e) => Err(e),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(attempts = attempt, error = %err, "oracle call failed after retries");
                    return Err(OracleError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        next_delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "oracle call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
