// Interval planner - Splits a date range into upstream-legal intervals
use crate::domain::series::Interval;
use chrono::{Days, Months, NaiveDate};

/// Upstream limit on the span of a single dated request.
pub const MAX_SPAN_YEARS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlanner {
    max_span: Months,
}

impl Default for IntervalPlanner {
    fn default() -> Self {
        Self::new(MAX_SPAN_YEARS)
    }
}

impl IntervalPlanner {
    pub fn new(max_span_years: u32) -> Self {
        Self {
            max_span: Months::new(max_span_years.max(1) * 12),
        }
    }

    /// Last day of the interval starting at `start` (one day short of a full span).
    fn span_end(&self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_months(self.max_span)
            .and_then(|d| d.checked_sub_days(Days::new(1)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Default start for an open range ending at `end`: exactly one full interval.
    pub fn default_start(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_months(self.max_span)
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Partition `[start, end]` into contiguous, ordered intervals.
    ///
    /// Assumes `start <= end`; validation happens before planning.
    pub fn plan(&self, start: NaiveDate, end: NaiveDate) -> Vec<Interval> {
        let mut intervals = Vec::new();
        let mut cursor = start;

        while cursor <= end {
            let chunk_end = self.span_end(cursor).min(end);
            intervals.push(Interval::new(cursor, chunk_end));

            match chunk_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }

        intervals
    }
}
