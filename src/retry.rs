//! Bounded polling with backoff.
//!
//! Used where a reconcile must wait synchronously for another controller to
//! act on an object it just created (e.g. a PVC being bound). Sleeping goes
//! through [`Sleeper`] so tests can observe the delays without waiting.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Source of delays between polling attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to poll and how long to wait in between
///
/// The delay grows linearly: `step * attempt` after each pending attempt, so a
/// one second step waits 1s, 2s, 3s, ...
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self { max_attempts, step }
    }

    /// Delay after the given 1-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step * attempt
    }

    /// Total time slept when every attempt comes back pending
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay(a)).sum()
    }
}

/// Result of a single probe
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Poll<T, P> {
    /// Condition met, stop polling
    Ready(T),
    /// Not there yet; carries the observation for reporting
    Pending(P),
}

/// Probe until it reports [`Poll::Ready`] or the attempts run out.
///
/// Returns the last [`Poll::Pending`] observation when attempts are exhausted.
/// A probe error aborts immediately. No sleep happens after the final attempt.
pub async fn poll_until<F, Fut, T, P, E>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut probe: F,
) -> Result<Poll<T, P>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Poll<T, P>, E>>,
    P: std::fmt::Debug,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match probe(attempt).await? {
            Poll::Ready(value) => return Ok(Poll::Ready(value)),
            Poll::Pending(observed) => {
                if attempt >= attempts {
                    return Ok(Poll::Pending(observed));
                }

                let delay = policy.delay(attempt);
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    observed = ?observed,
                    delay_ms = delay.as_millis() as u64,
                    "Condition not met, polling again"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(4), Duration::from_secs(4));
    }

    #[test]
    fn test_total_delay() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(1));
        assert_eq!(policy.total_delay(), Duration::from_secs(10));

        let policy = RetryPolicy::linear(1, Duration::from_secs(1));
        assert_eq!(policy.total_delay(), Duration::ZERO);
    }
}
