// Series service - The client surface: resolve, cache, plan, fetch, merge
use crate::application::catalog_service::CatalogService;
use crate::application::fetcher::BoundedFetcher;
use crate::application::interval_planner::IntervalPlanner;
use crate::application::retry::TokioSleeper;
use crate::application::ttl_policy::TtlPolicy;
use crate::domain::catalog::CatalogEntry;
use crate::domain::series::{RangeSpec, SeriesPoint, SeriesRequest};
use crate::error::{Result, SgsError};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::config::Settings;
use crate::infrastructure::file_cache::{CacheKey, FileCache};
use crate::infrastructure::sgs_repository::SgsRepository;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

#[derive(Clone)]
pub struct SeriesService {
    catalog: CatalogService,
    fetcher: BoundedFetcher,
    planner: IntervalPlanner,
    ttl: TtlPolicy,
    clock: Arc<dyn Clock>,
    cache: Arc<RwLock<Option<Arc<FileCache>>>>,
}

impl SeriesService {
    pub fn new(
        catalog: CatalogService,
        fetcher: BoundedFetcher,
        planner: IntervalPlanner,
        ttl: TtlPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            planner,
            ttl,
            clock,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Wire the production stack from settings. The cache starts disabled.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = Arc::new(SgsRepository::new(settings.upstream.base_url.clone()));
        let fetcher = BoundedFetcher::new(
            source,
            settings.retry_policy(),
            Arc::new(TokioSleeper),
            settings.fetcher_settings(),
        );

        Ok(Self::new(
            CatalogService::default(),
            fetcher,
            IntervalPlanner::new(settings.fetch.max_span_years),
            settings.ttl_policy()?,
            Arc::new(SystemClock),
        ))
    }

    /// Resolve the identifier and normalize the query shape. No network I/O.
    ///
    /// `last_n` takes precedence over a start/end pair. Open ends default to
    /// today and to one full upstream interval before the end.
    pub fn resolve(&self, request: &SeriesRequest) -> Result<CacheKey> {
        let code = self.catalog.resolve(&request.identifier)?;

        if let Some(n) = request.last_n {
            if n == 0 {
                return Err(SgsError::invalid("last_n must be a positive integer"));
            }
            return Ok(CacheKey::new(code, RangeSpec::Last(n)));
        }

        let end = request.end.unwrap_or_else(|| self.clock.today());
        let start = request
            .start
            .unwrap_or_else(|| self.planner.default_start(end));
        if start > end {
            return Err(SgsError::invalid(format!(
                "start date ({start}) is after end date ({end})"
            )));
        }

        Ok(CacheKey::new(code, RangeSpec::Between { start, end }))
    }

    /// Fetch a series as an ordered, deduplicated sequence of points.
    pub async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<SeriesPoint>> {
        let key = self.resolve(request)?;
        self.fetch_resolved(key, &self.fetcher.limiter()).await
    }

    /// `fetch` bounded by a caller deadline. On expiry in-flight calls are
    /// dropped and nothing is cached.
    pub async fn fetch_with_deadline(
        &self,
        request: &SeriesRequest,
        deadline: Duration,
    ) -> Result<Vec<SeriesPoint>> {
        match tokio::time::timeout(deadline, self.fetch(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Request for '{}' exceeded deadline {:?}",
                    request.identifier,
                    deadline
                );
                Err(SgsError::DeadlineExceeded)
            }
        }
    }

    /// Fetch several labelled series concurrently under one limiter.
    /// Series with no data upstream are left out of the result.
    pub async fn fetch_many<I>(&self, requests: I) -> Result<BTreeMap<String, Vec<SeriesPoint>>>
    where
        I: IntoIterator<Item = (String, SeriesRequest)>,
    {
        let keyed = requests
            .into_iter()
            .map(|(label, request)| self.resolve(&request).map(|key| (label, key)))
            .collect::<Result<Vec<_>>>()?;

        let limiter = self.fetcher.limiter();
        let tasks = keyed.into_iter().map(|(label, key)| {
            let limiter = limiter.clone();
            async move { (label, self.fetch_resolved(key, &limiter).await) }
        });

        let mut table = BTreeMap::new();
        for (label, result) in futures::future::join_all(tasks).await {
            match result {
                Ok(points) => {
                    table.insert(label, points);
                }
                Err(SgsError::SeriesNotFound { code }) => {
                    tracing::warn!("Series {} ('{}') returned no data, omitted", code, label);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(table)
    }

    async fn fetch_resolved(
        &self,
        key: CacheKey,
        limiter: &Semaphore,
    ) -> Result<Vec<SeriesPoint>> {
        let cache = self.cache.read().await.clone();

        if let Some(cache) = &cache {
            match cache.get(&key).await {
                Ok(Some(points)) => return Ok(points),
                Ok(None) => {}
                Err(e) => tracing::warn!("Cache read failed, fetching upstream: {}", e),
            }
        }

        let (points, complete) = match key.range {
            RangeSpec::Last(n) => (self.fetcher.fetch_last(key.code, n, limiter).await?, true),
            RangeSpec::Between { start, end } => {
                let intervals = self.planner.plan(start, end);
                tracing::debug!(
                    "Series {}: {} to {} planned as {} intervals",
                    key.code,
                    start,
                    end,
                    intervals.len()
                );
                let fetched = self.fetcher.fetch_range(key.code, &intervals, limiter).await?;
                let complete = fetched.is_complete();
                (fetched.points, complete)
            }
        };

        // Failed intervals must be fetched again on the next call
        if !complete {
            tracing::warn!("Series {}: partial result not cached", key.code);
        } else if let Some(cache) = &cache {
            let periodicity = self.catalog.metadata(key.code).map(|e| e.periodicity);
            let ttl = self.ttl.ttl_for(periodicity, self.clock.now());
            if let Err(e) = cache.put(&key, &points, ttl).await {
                tracing::warn!("Cache write failed, continuing without it: {}", e);
            }
        }

        Ok(points)
    }

    pub fn metadata(&self, code: u32) -> Option<&CatalogEntry> {
        self.catalog.metadata(code)
    }

    pub fn search_catalog(&self, term: &str) -> Vec<&CatalogEntry> {
        self.catalog.search(term)
    }

    pub fn list_catalog(&self) -> Vec<&CatalogEntry> {
        self.catalog.list()
    }

    /// Start caching under `path`. On failure the service keeps fetching
    /// without a cache and the error is returned for the caller to report.
    pub async fn enable_cache(&self, path: impl Into<PathBuf>) -> Result<()> {
        let cache = FileCache::open(path, self.clock.clone()).await?;
        tracing::info!("Local cache enabled at {}", cache.dir().display());
        *self.cache.write().await = Some(Arc::new(cache));
        Ok(())
    }

    pub async fn disable_cache(&self) {
        if self.cache.write().await.take().is_some() {
            tracing::info!("Local cache disabled");
        }
    }

    pub async fn is_cache_enabled(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Drop every cached entry. A no-op returning 0 when caching is off.
    pub async fn clear_cache(&self) -> Result<usize> {
        match self.cache.read().await.clone() {
            Some(cache) => cache.invalidate_all().await,
            None => Ok(0),
        }
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        match self.cache.read().await.clone() {
            Some(cache) => cache.purge_expired().await,
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fetcher::FetcherSettings;
    use crate::application::fetcher::tests::{StubSource, d};
    use crate::application::retry::RetryPolicy;
    use crate::application::retry::tests::RecordingSleeper;
    use crate::error::UpstreamError;
    use crate::infrastructure::clock::tests::ManualClock;
    use chrono::{TimeZone, Utc};

    struct Harness {
        service: SeriesService,
        source: Arc<StubSource>,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    async fn harness(source: StubSource) -> Harness {
        let source = Arc::new(source);
        // Tuesday 10:00 in Brasília
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 13, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::at(now));
        let fetcher = BoundedFetcher::new(
            source.clone(),
            RetryPolicy::default(),
            Arc::new(RecordingSleeper::default()),
            FetcherSettings::default(),
        );
        let service = SeriesService::new(
            CatalogService::default(),
            fetcher,
            IntervalPlanner::default(),
            TtlPolicy::default(),
            clock.clone(),
        );
        let dir = tempfile::tempdir().unwrap();
        service.enable_cache(dir.path()).await.unwrap();

        Harness {
            service,
            source,
            clock,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_twenty_five_years_one_continuous_series() {
        let h = harness(StubSource::default()).await;
        let request = SeriesRequest::new("11").between(d(2000, 1, 1), d(2024, 12, 31));

        let points = h.service.fetch(&request).await.unwrap();

        assert_eq!(h.source.calls(), 3);
        assert_eq!(points.first().unwrap().date, d(2000, 1, 1));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        for boundary in [d(2010, 1, 1), d(2020, 1, 1)] {
            assert_eq!(points.iter().filter(|p| p.date == boundary).count(), 1);
        }
        // 25 years of monthly points plus the stub's trailing boundary point
        assert_eq!(points.len(), 25 * 12 + 1);
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_hits_cache() {
        let h = harness(StubSource::default()).await;
        let request = SeriesRequest::new("11").between(d(2000, 1, 1), d(2024, 12, 31));

        let first = h.service.fetch(&request).await.unwrap();
        let second = h.service.fetch(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.source.calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_after_ttl_refetches_once() {
        let h = harness(StubSource::default()).await;
        let request = SeriesRequest::new("11").between(d(2000, 1, 1), d(2024, 12, 31));

        h.service.fetch(&request).await.unwrap();
        // Daily series during business hours: one hour
        h.clock.advance(chrono::Duration::minutes(61));
        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 6);

        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 6);
    }

    #[tokio::test]
    async fn test_partial_result_is_not_cached() {
        let h = harness(StubSource::default()).await;
        h.source.script(d(2000, 1, 1), vec![UpstreamError::Server(503); 4]);
        let request = SeriesRequest::new("11").between(d(2000, 1, 1), d(2024, 12, 31));

        let first = h.service.fetch(&request).await.unwrap();
        assert_eq!(first.first().unwrap().date, d(2010, 1, 1));
        assert_eq!(h.source.calls(), 6);

        // Upstream recovered: the missing decade is fetched again
        h.clock.advance(chrono::Duration::minutes(5));
        let second = h.service.fetch(&request).await.unwrap();
        assert_eq!(second.first().unwrap().date, d(2000, 1, 1));
        assert_eq!(h.source.calls(), 9);

        // The complete result is cached
        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 9);
    }

    #[tokio::test]
    async fn test_alias_and_code_share_cache_entry() {
        let h = harness(StubSource::default()).await;

        h.service
            .fetch(&SeriesRequest::new("Selic").between(d(2020, 1, 1), d(2020, 12, 31)))
            .await
            .unwrap();
        h.service
            .fetch(&SeriesRequest::new("11").between(d(2020, 1, 1), d(2020, 12, 31)))
            .await
            .unwrap();

        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_upstream() {
        let h = harness(StubSource::default()).await;

        let reversed = SeriesRequest::new("11").between(d(2024, 1, 1), d(2020, 1, 1));
        assert!(matches!(
            h.service.fetch(&reversed).await,
            Err(SgsError::InvalidParameters(_))
        ));

        let unknown = SeriesRequest::new("not_a_series");
        assert!(matches!(
            h.service.fetch(&unknown).await,
            Err(SgsError::UnknownSeries(_))
        ));

        let zero = SeriesRequest::new("11").last(0);
        assert!(h.service.fetch(&zero).await.unwrap_err().is_invalid_parameters());

        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_window_is_one_interval_ending_today() {
        let h = harness(StubSource::default()).await;

        let key = h.service.resolve(&SeriesRequest::new("433")).unwrap();
        assert_eq!(
            key.range,
            RangeSpec::Between {
                start: d(2015, 1, 1),
                end: d(2024, 12, 31)
            }
        );

        h.service.fetch(&SeriesRequest::new("433")).await.unwrap();
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_last_n_wins_over_range_and_is_cached() {
        let h = harness(StubSource {
            last_points: (1..=10).map(|i| SeriesPoint::new(d(2024, 12, i), f64::from(i))).collect(),
            ..StubSource::default()
        })
        .await;
        let request = SeriesRequest::new("ipca")
            .between(d(2000, 1, 1), d(2024, 12, 31))
            .last(3);

        let points = h.service.fetch(&request).await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, d(2024, 12, 8));

        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_not_found_raises() {
        let h = harness(StubSource {
            no_data_before: Some(d(2100, 1, 1)),
            ..StubSource::default()
        })
        .await;

        let err = h
            .service
            .fetch(&SeriesRequest::new("99999").between(d(1990, 1, 1), d(2024, 12, 31)))
            .await
            .unwrap_err();
        assert!(matches!(err, SgsError::SeriesNotFound { code: 99999 }));
        assert_eq!(h.service.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_forty_years_with_missing_early_decades() {
        let h = harness(StubSource {
            no_data_before: Some(d(2004, 1, 1)),
            ..StubSource::default()
        })
        .await;

        let points = h
            .service
            .fetch(&SeriesRequest::new("1").between(d(1984, 1, 1), d(2023, 12, 31)))
            .await
            .unwrap();

        assert_eq!(points.first().unwrap().date, d(2004, 1, 1));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_cache_unavailable_degrades_to_fetching() {
        let h = harness(StubSource::default()).await;
        h.service.disable_cache().await;

        let blocker = h._dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(matches!(
            h.service.enable_cache(&blocker).await,
            Err(SgsError::CacheUnavailable(_))
        ));
        assert!(!h.service.is_cache_enabled().await);

        let request = SeriesRequest::new("11").between(d(2024, 1, 1), d(2024, 6, 30));
        h.service.fetch(&request).await.unwrap();
        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let h = harness(StubSource::default()).await;
        let request = SeriesRequest::new("11").between(d(2024, 1, 1), d(2024, 6, 30));

        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.service.clear_cache().await.unwrap(), 1);
        h.service.fetch(&request).await.unwrap();
        assert_eq!(h.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_deadline_discards_partial_results() {
        let h = harness(StubSource {
            latency: Duration::from_secs(5),
            ..StubSource::default()
        })
        .await;
        let request = SeriesRequest::new("11").between(d(2000, 1, 1), d(2024, 12, 31));

        let err = h
            .service
            .fetch_with_deadline(&request, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, SgsError::DeadlineExceeded));
        assert_eq!(h.service.clear_cache().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_many_omits_missing_series() {
        let h = harness(StubSource {
            no_data_before: Some(d(2015, 1, 1)),
            ..StubSource::default()
        })
        .await;

        let table = h
            .service
            .fetch_many(vec![
                (
                    "Selic".to_string(),
                    SeriesRequest::new("selic").between(d(2020, 1, 1), d(2020, 12, 31)),
                ),
                (
                    "Old".to_string(),
                    SeriesRequest::new("433").between(d(2000, 1, 1), d(2009, 12, 31)),
                ),
            ])
            .await
            .unwrap();

        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["Selic"]);
        assert_eq!(table["Selic"].first().unwrap().date, d(2020, 1, 1));
    }

    #[tokio::test]
    async fn test_catalog_surface() {
        let h = harness(StubSource::default()).await;
        assert_eq!(h.service.metadata(11).unwrap().canonical_name, "Selic daily");
        assert!(h.service.metadata(42).is_none());
        assert!(!h.service.search_catalog("euro").is_empty());
        assert!(h.service.search_catalog("zzz").is_empty());
        assert_eq!(h.service.list_catalog().len(), 14);
    }
}
