// SGS time-series client - Planned, bounded and cached fetches of long date ranges

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::catalog_service::CatalogService;
pub use application::fetcher::{BoundedFetcher, FetcherSettings};
pub use application::interval_planner::IntervalPlanner;
pub use application::retry::{RetryPolicy, TokioSleeper};
pub use application::series_service::SeriesService;
pub use application::ttl_policy::TtlPolicy;
pub use domain::catalog::{CatalogEntry, Periodicity};
pub use domain::series::{SeriesPoint, SeriesRequest};
pub use error::{Result, SgsError};
pub use infrastructure::clock::SystemClock;
pub use infrastructure::config::{Settings, load_settings};
pub use infrastructure::sgs_repository::SgsRepository;
