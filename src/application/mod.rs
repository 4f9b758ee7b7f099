// Application layer - Planning, fetching, merging and the client surface
pub mod catalog_service;
pub mod fetcher;
pub mod interval_planner;
pub mod merge;
pub mod retry;
pub mod series_service;
pub mod series_source;
pub mod ttl_policy;
