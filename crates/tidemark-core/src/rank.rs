//! Dense ranking and period-over-period rank movement.
//!
//! Ranks are dense (1..k, no gaps) and deterministic: value descending, then
//! entity id ascending so equal values still get distinct, reproducible
//! ranks. The diff compares each entity's rank now against its rank at the
//! previous observation; entities with no prior observation are `"new"`, and
//! entities that dropped out of the current set are omitted entirely.

use std::collections::BTreeMap;

use crate::model::{HistorySnapshot, RankShift};

/// One entity's value at a specific point in time. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankObservation {
    pub entity_id: String,
    pub value: u64,
}

impl RankObservation {
    #[must_use]
    pub fn new(entity_id: impl Into<String>, value: u64) -> Self {
        Self {
            entity_id: entity_id.into(),
            value,
        }
    }
}

/// The last sample of every non-empty series.
#[must_use]
pub fn latest_observations(snapshot: &HistorySnapshot) -> Vec<RankObservation> {
    nth_from_end(snapshot, 0)
}

/// The second-to-last sample of every series that has one.
///
/// Read this before compaction runs: the point immediately preceding the
/// latest one is exactly the kind of point compaction is allowed to remove
/// once it ages out of the hot window.
#[must_use]
pub fn previous_observations(snapshot: &HistorySnapshot) -> Vec<RankObservation> {
    nth_from_end(snapshot, 1)
}

fn nth_from_end(snapshot: &HistorySnapshot, offset: usize) -> Vec<RankObservation> {
    snapshot
        .series
        .iter()
        .filter_map(|(entity_id, series)| {
            let mut sorted = series.clone();
            sorted.sort_by_key(|point| point.date);
            sorted
                .len()
                .checked_sub(offset + 1)
                .map(|i| RankObservation::new(entity_id.clone(), sorted[i].value))
        })
        .collect()
}

/// Assign dense ranks 1..k: value descending, entity id ascending on ties.
#[must_use]
pub fn dense_ranks(mut observations: Vec<RankObservation>) -> BTreeMap<String, i64> {
    observations.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    let mut ranks = BTreeMap::new();
    let mut rank = 0i64;
    for observation in observations {
        rank += 1;
        ranks.insert(observation.entity_id, rank);
    }
    ranks
}

/// Rank movement for every entity in `current`.
///
/// `previous rank − current rank`: positive means the entity climbed. An
/// entity absent from `previous` maps to [`RankShift::New`]; an entity absent
/// from `current` gets no entry.
#[must_use]
pub fn rank_shifts(
    current: Vec<RankObservation>,
    previous: Vec<RankObservation>,
) -> BTreeMap<String, RankShift> {
    let current_ranks = dense_ranks(current);
    let previous_ranks = dense_ranks(previous);

    current_ranks
        .into_iter()
        .map(|(entity_id, rank)| {
            let shift = previous_ranks
                .get(&entity_id)
                .map_or(RankShift::New, |&prev| RankShift::Moved(prev - rank));
            (entity_id, shift)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SamplePoint;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    fn obs(pairs: &[(&str, u64)]) -> Vec<RankObservation> {
        pairs
            .iter()
            .map(|&(id, value)| RankObservation::new(id, value))
            .collect()
    }

    #[test]
    fn ranks_descend_by_value() {
        let ranks = dense_ranks(obs(&[("a", 10), ("b", 30), ("c", 20)]));
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 2);
        assert_eq!(ranks["a"], 3);
    }

    #[test]
    fn ties_break_by_entity_id() {
        let ranks = dense_ranks(obs(&[("z", 100), ("a", 100), ("m", 100)]));
        assert_eq!(ranks["a"], 1);
        assert_eq!(ranks["m"], 2);
        assert_eq!(ranks["z"], 3);
    }

    #[test]
    fn new_entity_gets_sentinel() {
        // previous = A:100, B:90; current adds C.
        let shifts = rank_shifts(
            obs(&[("A", 100), ("B", 95), ("C", 80)]),
            obs(&[("A", 100), ("B", 90)]),
        );
        assert_eq!(shifts["A"], RankShift::Moved(0));
        assert_eq!(shifts["B"], RankShift::Moved(0));
        assert_eq!(shifts["C"], RankShift::New);
    }

    #[test]
    fn overtake_moves_both_directions() {
        let shifts = rank_shifts(obs(&[("A", 120), ("B", 100)]), obs(&[("A", 50), ("B", 100)]));
        assert_eq!(shifts["A"], RankShift::Moved(1));
        assert_eq!(shifts["B"], RankShift::Moved(-1));
    }

    #[test]
    fn dropped_entity_omitted_from_output() {
        let shifts = rank_shifts(obs(&[("A", 10)]), obs(&[("A", 10), ("B", 20)]));
        assert_eq!(shifts.len(), 1);
        assert!(!shifts.contains_key("B"));
        // A was rank 2, now rank 1.
        assert_eq!(shifts["A"], RankShift::Moved(1));
    }

    #[test]
    fn empty_current_yields_empty_output() {
        let shifts = rank_shifts(Vec::new(), obs(&[("A", 10)]));
        assert!(shifts.is_empty());
    }

    #[test]
    fn observations_read_last_and_second_to_last() {
        let mut snapshot = HistorySnapshot::default();
        snapshot.series.insert(
            "a".to_string(),
            vec![
                SamplePoint::new(day(1), 100),
                SamplePoint::new(day(2), 110),
                SamplePoint::new(day(3), 120),
            ],
        );
        snapshot
            .series
            .insert("b".to_string(), vec![SamplePoint::new(day(3), 40)]);
        snapshot.series.insert("c".to_string(), Vec::new());

        let latest = latest_observations(&snapshot);
        assert_eq!(
            latest,
            vec![
                RankObservation::new("a", 120),
                RankObservation::new("b", 40)
            ]
        );

        // Only `a` has a second-to-last point.
        let previous = previous_observations(&snapshot);
        assert_eq!(previous, vec![RankObservation::new("a", 110)]);
    }

    #[test]
    fn observations_sort_unsorted_series_first() {
        let mut snapshot = HistorySnapshot::default();
        snapshot.series.insert(
            "a".to_string(),
            vec![
                SamplePoint::new(day(3), 120),
                SamplePoint::new(day(1), 100),
            ],
        );
        let latest = latest_observations(&snapshot);
        assert_eq!(latest, vec![RankObservation::new("a", 120)]);
    }
}
