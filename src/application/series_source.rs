// Port for upstream time-series access
use crate::domain::series::{Interval, SeriesPoint};
use crate::error::UpstreamError;
use async_trait::async_trait;
use std::time::Duration;

pub type SourceResult = Result<Vec<SeriesPoint>, UpstreamError>;

/// One upstream call per method; no retries, no caching.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch a single upstream-legal interval of a series.
    /// An interval with no observations is `Ok(vec![])` or `Err(NotFound)`.
    async fn fetch_interval(
        &self,
        code: u32,
        interval: Interval,
        timeout: Duration,
    ) -> SourceResult;

    /// Fetch the most recent `n` observations of a series.
    async fn fetch_last(&self, code: u32, n: u32, timeout: Duration) -> SourceResult;
}
