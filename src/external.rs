//! Timeout and retry policy for calls to external collaborators.
//!
//! Every embedder, language model, and speech synthesizer call made by the
//! pipeline goes through [`CallPolicy::run`]. A call that exceeds the timeout
//! becomes an [`DuettError::ExternalCall`] for its stage. Only transient
//! failures are retried; rejected requests and malformed output are returned
//! immediately.

use crate::error::{DuettError, Result, Stage};
use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::warn;

/// Per-call timeout and bounded retry settings.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl CallPolicy {
    /// Build a policy from a timeout in seconds and a retry count.
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs.max(1)),
            max_retries,
            ..Self::default()
        }
    }

    /// Run `call` with the timeout, retrying transient failures.
    pub async fn run<T, F, Fut>(&self, stage: Stage, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result.map_err(|e| retag(e, stage)),
                Err(_) => Err(DuettError::external(
                    stage,
                    format!("{} timed out after {}s", what, self.timeout.as_secs()),
                )),
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Exponential backoff with up to 25% jitter, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        let jitter_nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter = base.mul_f64((jitter_nanos % 250) as f64 / 1000.0);

        (base + jitter).min(self.max_delay)
    }
}

/// Collaborators do not know which stage calls them; the caller's stage wins.
fn retag(err: DuettError, stage: Stage) -> DuettError {
    match err {
        DuettError::ExternalCall {
            message, retryable, ..
        } => DuettError::ExternalCall {
            stage,
            message,
            retryable,
        },
        other => other,
    }
}
