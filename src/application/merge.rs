// Merge & normalize - Combine per-interval results into one ordered series
use crate::domain::series::SeriesPoint;
use std::collections::BTreeMap;

/// Merge per-interval results into a single series sorted by date with
/// unique dates.
///
/// `parts` must be in interval order (ascending start). When a date appears
/// in more than one part, the value from the later-starting interval wins.
/// Empty parts are skipped. Never fails.
pub fn merge_intervals<I>(parts: I) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = Vec<SeriesPoint>>,
{
    let mut by_date: BTreeMap<_, f64> = BTreeMap::new();
    for part in parts {
        for point in part {
            by_date.insert(point.date, point.value);
        }
    }

    by_date
        .into_iter()
        .map(|(date, value)| SeriesPoint::new(date, value))
        .collect()
}
