//! The persisted history snapshot: every entity's series plus the as-of day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::SamplePoint;

/// Full persisted state of the engine.
///
/// `reference_date` is the as-of day used to compute compaction tier
/// boundaries; ingestion sets it to the ingestion day on every run. `series`
/// is a `BTreeMap` so serialization has a stable key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
    #[serde(default)]
    pub series: BTreeMap<String, Vec<SamplePoint>>,
}

impl HistorySnapshot {
    /// Total sample points across all series.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Number of entities with at least one sample.
    #[must_use]
    pub fn populated_series(&self) -> usize {
        self.series.values().filter(|s| !s.is_empty()).count()
    }
}
