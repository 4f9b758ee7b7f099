// Time-series domain models
use crate::error::{Result, SgsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Day-first format used by the upstream and accepted at the boundary.
pub const DAY_FIRST_FORMAT: &str = "%d/%m/%Y";
const ISO_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Inclusive date range sized to respect the upstream span limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Interval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// A caller's request before alias resolution and range normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesRequest {
    pub identifier: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub last_n: Option<u32>,
}

impl SeriesRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn last(mut self, n: u32) -> Self {
        self.last_n = Some(n);
        self
    }

    /// Build a request from boundary strings, parsing dates in either
    /// accepted format.
    pub fn parse(
        identifier: impl Into<String>,
        start: Option<&str>,
        end: Option<&str>,
        last_n: Option<u32>,
    ) -> Result<Self> {
        Ok(Self {
            identifier: identifier.into(),
            start: start.map(parse_date).transpose()?,
            end: end.map(parse_date).transpose()?,
            last_n,
        })
    }
}

/// Normalized query shape: what actually drives retrieval and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSpec {
    Between { start: NaiveDate, end: NaiveDate },
    Last(u32),
}

/// Parse a boundary date in ISO 8601 (`YYYY-MM-DD`) or day-first (`DD/MM/YYYY`) form.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    [ISO_FORMAT, DAY_FIRST_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            SgsError::invalid(format!(
                "invalid date '{value}': use YYYY-MM-DD or DD/MM/YYYY"
            ))
        })
}

pub fn format_day_first(date: NaiveDate) -> String {
    date.format(DAY_FIRST_FORMAT).to_string()
}
