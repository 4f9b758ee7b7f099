// Cache expiry policy derived from series periodicity
use crate::domain::catalog::Periodicity;
use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

/// Window during which daily series may publish new observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub offset: FixedOffset,
    /// First hour inside the window (inclusive).
    pub start_hour: u32,
    /// First hour after the window (exclusive).
    pub end_hour: u32,
}

impl BusinessHours {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);
        let weekday = !matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        weekday && (self.start_hour..self.end_hour).contains(&local.hour())
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            // Brasília time
            offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
            start_hour: 9,
            end_hour: 18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// `None` flattens daily series to one hour at all times.
    pub business_hours: Option<BusinessHours>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            business_hours: Some(BusinessHours::default()),
        }
    }
}

impl TtlPolicy {
    pub fn flat() -> Self {
        Self {
            business_hours: None,
        }
    }

    /// Expiry for a freshly stored entry. Series outside the catalog get one hour.
    pub fn ttl_for(&self, periodicity: Option<Periodicity>, now: DateTime<Utc>) -> Duration {
        match periodicity {
            Some(Periodicity::Daily) => match self.business_hours {
                Some(hours) if !hours.contains(now) => 24 * HOUR,
                _ => HOUR,
            },
            Some(Periodicity::Weekly) => 6 * HOUR,
            Some(Periodicity::Monthly) => 24 * HOUR,
            None => HOUR,
        }
    }
}
