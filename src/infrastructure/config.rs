use crate::application::fetcher::FetcherSettings;
use crate::application::retry::RetryPolicy;
use crate::application::ttl_policy::{BusinessHours, TtlPolicy};
use anyhow::Context;
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.bcb.gov.br/dados/serie";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub widen_timeout_on_retry: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            widen_timeout_on_retry: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchSettings {
    pub max_concurrent: usize,
    pub max_span_years: u32,
    pub shared_limit: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            max_span_years: 10,
            shared_limit: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_secs: Vec<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_secs: vec![1, 2, 5],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub flat_daily_ttl: bool,
    pub business_hours_utc_offset_hours: i32,
    pub business_hours_start: u32,
    pub business_hours_end: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            flat_daily_ttl: false,
            business_hours_utc_offset_hours: -3,
            business_hours_start: 9,
            business_hours_end: 18,
        }
    }
}

impl Settings {
    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            max_concurrent: self.fetch.max_concurrent.max(1),
            timeout: Duration::from_secs(self.upstream.timeout_secs.max(1)),
            widen_timeout_on_retry: self.upstream.widen_timeout_on_retry,
            shared_limit: self.fetch.shared_limit,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            self.retry
                .backoff_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }

    pub fn ttl_policy(&self) -> anyhow::Result<TtlPolicy> {
        if self.cache.flat_daily_ttl {
            return Ok(TtlPolicy::flat());
        }
        let offset = FixedOffset::east_opt(self.cache.business_hours_utc_offset_hours * 3600)
            .with_context(|| {
                format!(
                    "invalid business hours offset {}",
                    self.cache.business_hours_utc_offset_hours
                )
            })?;
        Ok(TtlPolicy {
            business_hours: Some(BusinessHours {
                offset,
                start_hour: self.cache.business_hours_start,
                end_hour: self.cache.business_hours_end,
            }),
        })
    }

    /// Configured cache directory, or `~/.sgs-timeseries/cache`.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.path.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".sgs-timeseries")
                .join("cache")
        })
    }
}

/// Load settings from `config/sgs` (optional) overlaid with `SGS_*` variables,
/// e.g. `SGS_UPSTREAM__TIMEOUT_SECS=10`.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from("config/sgs")
}

pub fn load_settings_from(file: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix("SGS")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("retry.backoff_secs")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build SGS settings")?;

    settings
        .try_deserialize()
        .context("Failed to deserialize SGS settings")
}
