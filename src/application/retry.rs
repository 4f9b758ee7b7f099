// Retry policy - Fixed backoff schedule and a retry-while combinator

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration for retrying a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before retry `i` is `schedule[i]`; the last entry repeats.
    pub schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, schedule: Vec<Duration>) -> Self {
        Self {
            max_retries,
            schedule,
        }
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self::new(0, Vec::new())
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let idx = attempt as usize;
        self.schedule
            .get(idx)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `op` until it succeeds, fails with an error `should_retry` rejects,
    /// or the attempt budget runs out. `op` receives the 0-based attempt number.
    ///
    /// Returns the final result together with the number of attempts made.
    pub async fn retry_while<T, E, Op, Fut, P>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: Op,
        should_retry: P,
    ) -> (Result<T, E>, u32)
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E, u32) -> bool,
    {
        let mut attempt = 0;
        loop {
            let result = op(attempt).await;
            match result {
                Err(ref e) if attempt < self.max_retries && should_retry(e, attempt) => {
                    sleeper.sleep(self.next_delay(attempt)).await;
                    attempt += 1;
                }
                other => return (other, attempt + 1),
            }
        }
    }
}
