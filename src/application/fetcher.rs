// Bounded fetcher - Concurrency-capped interval fetches with per-interval retry
use crate::application::merge::merge_intervals;
use crate::application::retry::{RetryPolicy, Sleeper};
use crate::application::series_source::{SeriesSource, SourceResult};
use crate::domain::series::{Interval, SeriesPoint};
use crate::error::{Result, SgsError, UpstreamError};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherSettings {
    /// Simultaneous in-flight upstream calls per limiter.
    pub max_concurrent: usize,
    /// Timeout of a single upstream call.
    pub timeout: Duration,
    /// Grow the timeout linearly with the attempt number.
    pub widen_timeout_on_retry: bool,
    /// One limiter for the whole fetcher instead of one per outer request.
    pub shared_limit: bool,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: DEFAULT_TIMEOUT,
            widen_timeout_on_retry: false,
            shared_limit: false,
        }
    }
}

/// Merged result of a planned range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFetch {
    pub points: Vec<SeriesPoint>,
    /// Intervals that still failed after retries and are missing from `points`.
    pub failed_intervals: usize,
}

impl RangeFetch {
    pub fn is_complete(&self) -> bool {
        self.failed_intervals == 0
    }
}

/// Final state of one interval after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalOutcome {
    Data(Vec<SeriesPoint>),
    /// Upstream answered "no data" for this interval.
    Empty,
    Failed { error: UpstreamError, attempts: u32 },
}

#[derive(Clone)]
pub struct BoundedFetcher {
    source: Arc<dyn SeriesSource>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    settings: FetcherSettings,
    shared: Option<Arc<Semaphore>>,
}

impl BoundedFetcher {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        settings: FetcherSettings,
    ) -> Self {
        let shared = settings
            .shared_limit
            .then(|| Arc::new(Semaphore::new(settings.max_concurrent.max(1))));
        Self {
            source,
            retry,
            sleeper,
            settings,
            shared,
        }
    }

    /// Limiter for one outer request: the shared one, or a fresh one.
    pub fn limiter(&self) -> Arc<Semaphore> {
        match &self.shared {
            Some(shared) => shared.clone(),
            None => Arc::new(Semaphore::new(self.settings.max_concurrent.max(1))),
        }
    }

    fn timeout_for(&self, attempt: u32) -> Duration {
        if self.settings.widen_timeout_on_retry {
            self.settings.timeout * (attempt + 1)
        } else {
            self.settings.timeout
        }
    }

    /// Run one upstream call under the per-call timeout.
    async fn call_with_timeout<F>(&self, attempt: u32, call: F) -> SourceResult
    where
        F: FnOnce(Duration) -> BoxFuture<'static, SourceResult>,
    {
        let timeout = self.timeout_for(attempt);
        match tokio::time::timeout(timeout, call(timeout)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout),
        }
    }

    fn should_retry(code: u32, error: &UpstreamError, attempt: u32, policy: &RetryPolicy) -> bool {
        let retry = error.is_retryable();
        if retry {
            tracing::warn!(
                "Upstream {} for series {}. Retry {}/{} in {:?}",
                error,
                code,
                attempt + 1,
                policy.max_retries,
                policy.next_delay(attempt)
            );
        }
        retry
    }

    /// Fetch one interval, retrying transient failures.
    pub async fn fetch_interval(&self, code: u32, interval: Interval) -> IntervalOutcome {
        let (result, attempts) = self
            .retry
            .retry_while(
                self.sleeper.as_ref(),
                |attempt| {
                    let source = self.source.clone();
                    self.call_with_timeout(attempt, move |timeout| {
                        async move { source.fetch_interval(code, interval, timeout).await }.boxed()
                    })
                },
                |e, attempt| Self::should_retry(code, e, attempt, &self.retry),
            )
            .await;

        match result {
            Ok(points) if points.is_empty() => IntervalOutcome::Empty,
            Ok(points) => IntervalOutcome::Data(points),
            Err(UpstreamError::NotFound) => IntervalOutcome::Empty,
            Err(error) => IntervalOutcome::Failed { error, attempts },
        }
    }

    /// Fetch every interval, at most `max_concurrent` at a time on `limiter`.
    /// Outcomes are returned in interval order.
    pub async fn fetch_intervals(
        &self,
        code: u32,
        intervals: &[Interval],
        limiter: &Semaphore,
    ) -> Vec<IntervalOutcome> {
        let tasks = intervals.iter().map(|interval| async move {
            let Ok(_permit) = limiter.acquire().await else {
                return IntervalOutcome::Failed {
                    error: UpstreamError::Transport("concurrency limiter closed".into()),
                    attempts: 0,
                };
            };
            tracing::debug!(
                "Fetching series {} from {} to {}",
                code,
                interval.start,
                interval.end
            );
            self.fetch_interval(code, *interval).await
        });

        futures::future::join_all(tasks).await
    }

    /// Fetch, aggregate and merge a planned range into one ordered series.
    pub async fn fetch_range(
        &self,
        code: u32,
        intervals: &[Interval],
        limiter: &Semaphore,
    ) -> Result<RangeFetch> {
        let outcomes = self.fetch_intervals(code, intervals, limiter).await;
        aggregate(code, intervals, outcomes)
    }

    /// Fetch the last `n` observations in a single retried call.
    pub async fn fetch_last(
        &self,
        code: u32,
        n: u32,
        limiter: &Semaphore,
    ) -> Result<Vec<SeriesPoint>> {
        let _permit = limiter
            .acquire()
            .await
            .map_err(|e| SgsError::Transport {
                code,
                message: e.to_string(),
            })?;

        let (result, attempts) = self
            .retry
            .retry_while(
                self.sleeper.as_ref(),
                |attempt| {
                    let source = self.source.clone();
                    self.call_with_timeout(attempt, move |timeout| {
                        async move { source.fetch_last(code, n, timeout).await }.boxed()
                    })
                },
                |e, attempt| Self::should_retry(code, e, attempt, &self.retry),
            )
            .await;

        match result {
            Ok(points) if points.is_empty() => Err(SgsError::SeriesNotFound { code }),
            Ok(points) => Ok(merge_intervals([points])),
            Err(error) => Err(error.into_request_error(code, attempts)),
        }
    }
}

/// Partial tolerance: any interval with data makes the request succeed.
fn aggregate(
    code: u32,
    intervals: &[Interval],
    outcomes: Vec<IntervalOutcome>,
) -> Result<RangeFetch> {
    let mut parts = Vec::with_capacity(outcomes.len());
    let mut saw_empty = false;
    let mut first_failure: Option<(UpstreamError, u32)> = None;
    let mut dropped = 0;

    for (interval, outcome) in intervals.iter().zip(outcomes) {
        match outcome {
            IntervalOutcome::Data(points) => parts.push(points),
            IntervalOutcome::Empty => {
                tracing::debug!(
                    "No data for series {} between {} and {}",
                    code,
                    interval.start,
                    interval.end
                );
                saw_empty = true;
            }
            IntervalOutcome::Failed { error, attempts } => {
                tracing::warn!(
                    "Series {} interval {}..{} failed after {} attempts: {}",
                    code,
                    interval.start,
                    interval.end,
                    attempts,
                    error
                );
                dropped += 1;
                if first_failure.is_none() {
                    first_failure = Some((error, attempts));
                }
            }
        }
    }

    if parts.is_empty() {
        return Err(match first_failure {
            Some((error, attempts)) if !saw_empty => error.into_request_error(code, attempts),
            _ => SgsError::SeriesNotFound { code },
        });
    }

    if dropped > 0 {
        tracing::warn!(
            "Series {}: returning partial data, {} of {} intervals failed",
            code,
            dropped,
            intervals.len()
        );
    }

    Ok(RangeFetch {
        points: merge_intervals(parts),
        failed_intervals: dropped,
    })
}
