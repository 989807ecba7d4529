//! A single observed subscriber count on a calendar day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation in a series: a calendar day and the count seen that day.
///
/// Within a series dates are unique and points are kept sorted ascending by
/// date. Values may rise or fall; nothing about a series is monotonic except
/// its date order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub date: NaiveDate,
    pub value: u64,
}

impl SamplePoint {
    #[must_use]
    pub const fn new(date: NaiveDate, value: u64) -> Self {
        Self { date, value }
    }
}

/// Sort a series ascending by date and drop duplicate dates.
///
/// Later entries win on a duplicate date, matching upsert semantics: the most
/// recently appended observation for a day is the authoritative one.
pub fn normalize_series(series: &mut Vec<SamplePoint>) {
    series.sort_by_key(|point| point.date);
    // dedup_by keeps the *first* of each run, so walk runs manually and keep
    // the last entry for each date.
    let mut normalized: Vec<SamplePoint> = Vec::with_capacity(series.len());
    for point in series.drain(..) {
        match normalized.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => normalized.push(point),
        }
    }
    *series = normalized;
}
