//! Merging freshly observed counts into the snapshot.
//!
//! Ingestion is an upsert-by-date: re-running the pipeline on the same day
//! replaces that day's value instead of appending a duplicate, so a run is
//! idempotent. Entities in the catalog that the provider returned nothing for
//! are left untouched — no deletion, no zero-fill.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{HistorySnapshot, SamplePoint};

/// One freshly observed value for an entity, with the optional icon URL the
/// provider returns alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub value: u64,
    pub icon: Option<String>,
}

impl Observation {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self { value, icon: None }
    }
}

/// Insert or replace the sample for `date`, returning the series sorted
/// ascending by date.
///
/// Pure with respect to its inputs; applying the same `(date, value)` twice
/// yields the same series.
#[must_use]
pub fn upsert(mut series: Vec<SamplePoint>, date: NaiveDate, value: u64) -> Vec<SamplePoint> {
    series.sort_by_key(|point| point.date);
    match series.binary_search_by(|point| point.date.cmp(&date)) {
        Ok(i) => series[i].value = value,
        Err(i) => series.insert(i, SamplePoint::new(date, value)),
    }
    series
}

/// Upsert every observation into the snapshot under `day` and advance the
/// snapshot's reference date to `day`. Returns the number of entities
/// touched.
pub fn apply_observations(
    snapshot: &mut HistorySnapshot,
    day: NaiveDate,
    observations: &BTreeMap<String, Observation>,
) -> usize {
    for (entity_id, observation) in observations {
        let series = snapshot.series.entry(entity_id.clone()).or_default();
        *series = upsert(std::mem::take(series), day, observation.value);
    }
    snapshot.reference_date = Some(day);
    observations.len()
}
