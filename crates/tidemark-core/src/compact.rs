//! Tiered series compaction.
//!
//! A series grows by one point per day per entity. Compaction rewrites each
//! series so storage stays bounded while the points a viewer actually cares
//! about survive: recent history at full resolution, sudden jumps and drops
//! kept forever, long flat stretches thinned to a minimum sampling density.
//!
//! Three age tiers relative to the snapshot's reference date:
//!
//! - **Hot** (age < hot window): kept verbatim.
//! - **Warm** (hot window ≤ age < cold boundary): significance-gap pass with
//!   the warm max gap.
//! - **Cold** (age ≥ cold boundary): the warm pass's output for this range is
//!   decimated again with the cold max gap; points the warm pass flagged
//!   significant are exempt and survive unconditionally.
//!
//! Re-running with the same reference date and policy is a fixpoint: every
//! kept point already satisfies the significance/gap predicate against its
//! kept neighbors, so nothing further is removed.

use chrono::{Months, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::config::CompactionPolicy;
use crate::model::{HistorySnapshot, SamplePoint};

/// Totals reported after compacting a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactStats {
    pub points_before: usize,
    pub points_after: usize,
    pub series_shrunk: usize,
}

/// The tier cutoff dates derived from a reference date.
///
/// A point is hot on or after `hot`, cold before `cold`, warm in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBounds {
    pub hot: NaiveDate,
    pub cold: NaiveDate,
}

impl TierBounds {
    #[must_use]
    pub fn for_reference(reference_date: NaiveDate, policy: &CompactionPolicy) -> Self {
        Self {
            hot: subtract_months(reference_date, policy.hot_window_months),
            cold: subtract_months(reference_date, policy.cold_boundary_months),
        }
    }
}

// Saturates at the calendar floor; only reachable with absurd reference dates.
fn subtract_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// A point annotated with the significance verdict from the first walk.
#[derive(Debug, Clone, Copy)]
struct Flagged {
    point: SamplePoint,
    significant: bool,
}

/// Compact one series against `reference_date`.
///
/// The output is chronologically ordered, has no duplicate dates, and is
/// never longer than the input. Series of length 0 or 1 are returned
/// unchanged.
#[must_use]
pub fn compact_series(
    series: &[SamplePoint],
    reference_date: NaiveDate,
    policy: &CompactionPolicy,
) -> Vec<SamplePoint> {
    if series.len() <= 1 {
        return series.to_vec();
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|point| point.date);

    let bounds = TierBounds::for_reference(reference_date, policy);
    let hot_start = sorted.partition_point(|point| point.date < bounds.hot);
    if hot_start == 0 {
        // Everything is inside the hot window.
        return sorted;
    }
    let (older, hot) = sorted.split_at(hot_start);

    // First pass over everything older than the hot window: flag significant
    // points, then thin against the warm gap.
    let flagged = flag_significant(older, policy.significance_threshold);
    let kept = keep_with_gap(&flagged, policy.warm_max_gap_days);

    // Second pass over the cold range only. Significance flags carry over, so
    // a jump recorded years ago still survives the coarser gap.
    let cold_end = kept.partition_point(|entry| entry.point.date < bounds.cold);
    let (cold_input, warm) = kept.split_at(cold_end);
    let cold = keep_with_gap(cold_input, policy.cold_max_gap_days);

    cold.iter()
        .chain(warm.iter())
        .map(|entry| entry.point)
        .chain(hot.iter().copied())
        .collect()
}

/// Forward walk marking points whose value moved at least
/// `threshold × |last significant value|` since the last significant point.
/// The first and last points are always significant.
fn flag_significant(points: &[SamplePoint], threshold: f64) -> Vec<Flagged> {
    let mut flagged: Vec<Flagged> = points
        .iter()
        .map(|&point| Flagged {
            point,
            significant: false,
        })
        .collect();

    flagged[0].significant = true;
    let last = flagged.len() - 1;
    flagged[last].significant = true;

    let mut last_significant_value = points[0].value as f64;
    for entry in &mut flagged[1..] {
        let value = entry.point.value as f64;
        if (value - last_significant_value).abs() >= threshold * last_significant_value.abs() {
            entry.significant = true;
            last_significant_value = value;
        }
    }

    flagged
}

/// Second walk: keep significant points unconditionally, and any other point
/// at least `max_gap_days` after the previously kept one. The first point is
/// always kept.
fn keep_with_gap(flagged: &[Flagged], max_gap_days: i64) -> Vec<Flagged> {
    let mut kept: Vec<Flagged> = Vec::new();
    let mut last_kept_date: Option<NaiveDate> = None;

    for entry in flagged {
        let keep = entry.significant
            || last_kept_date.is_none_or(|date| {
                entry.point.date.signed_duration_since(date).num_days() >= max_gap_days
            });
        if keep {
            kept.push(*entry);
            last_kept_date = Some(entry.point.date);
        }
    }

    kept
}

/// Compact every series in the snapshot in place.
///
/// A snapshot without a reference date has never been ingested into; there is
/// no tier anchor, so this is a no-op.
pub fn compact_snapshot(snapshot: &mut HistorySnapshot, policy: &CompactionPolicy) -> CompactStats {
    let Some(reference_date) = snapshot.reference_date else {
        return CompactStats::default();
    };

    let mut stats = CompactStats::default();
    for (entity_id, series) in &mut snapshot.series {
        let compacted = compact_series(series, reference_date, policy);
        stats.points_before += series.len();
        stats.points_after += compacted.len();
        if compacted.len() < series.len() {
            stats.series_shrunk += 1;
            debug!(
                entity = entity_id.as_str(),
                before = series.len(),
                after = compacted.len(),
                "compacted series"
            );
        }
        *series = compacted;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn daily_series(start: NaiveDate, values: &[u64]) -> Vec<SamplePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                SamplePoint::new(start + Days::new(i as u64), value)
            })
            .collect()
    }

    #[test]
    fn short_series_unchanged() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 6, 1);
        assert!(compact_series(&[], reference, &policy).is_empty());

        let single = vec![SamplePoint::new(date(2020, 1, 1), 5)];
        assert_eq!(compact_series(&single, reference, &policy), single);
    }

    #[test]
    fn hot_tier_kept_verbatim() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 6, 30);
        // 20 daily points ending at the reference date, all within one month.
        let series = daily_series(date(2025, 6, 11), &[100; 20]);
        assert_eq!(compact_series(&series, reference, &policy), series);
    }

    #[test]
    fn flat_warm_stretch_thins_to_gap_density() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 12, 31);
        // 180 flat daily points, all older than a month, all newer than a year.
        let start = date(2025, 5, 1);
        let series = daily_series(start, &[1000; 180]);
        let result = compact_series(&series, reference, &policy);

        assert!(result.len() < series.len());
        // First and last of the older range survive.
        assert_eq!(result.first(), series.first());
        assert_eq!(result.last(), series.last());
        // No two consecutive kept points further apart than the warm gap.
        for pair in result.windows(2) {
            let gap = pair[1].date.signed_duration_since(pair[0].date).num_days();
            assert!(gap <= policy.warm_max_gap_days, "gap {gap} too wide");
        }
    }

    #[test]
    fn jumps_survive_even_when_adjacent() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 12, 31);
        let start = date(2025, 5, 1);
        let mut values = vec![1000u64; 120];
        // Two consecutive >=2% moves in the middle of the warm tier.
        values[60] = 1050;
        values[61] = 1000;
        let series = daily_series(start, &values);

        let result = compact_series(&series, reference, &policy);
        assert!(result.contains(&series[60]), "jump point dropped");
        assert!(result.contains(&series[61]), "recovery point dropped");
    }

    #[test]
    fn cold_tier_collapses_to_coarser_gap() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 12, 31);
        // Two flat years ending at the reference date.
        let start = date(2024, 1, 1);
        let days = reference.signed_duration_since(start).num_days() as usize + 1;
        let series = daily_series(start, &vec![5000u64; days]);

        let result = compact_series(&series, reference, &policy);
        let bounds = TierBounds::for_reference(reference, &policy);

        let cold: Vec<_> = result.iter().filter(|p| p.date < bounds.cold).collect();
        assert!(cold.len() >= 2);
        for pair in cold.windows(2) {
            let gap = pair[1].date.signed_duration_since(pair[0].date).num_days();
            assert!(gap <= policy.cold_max_gap_days, "cold gap {gap} too wide");
        }
        // Coarser than the warm tier: strictly fewer points per day range.
        let warm: Vec<_> = result
            .iter()
            .filter(|p| p.date >= bounds.cold && p.date < bounds.hot)
            .collect();
        assert!(!warm.is_empty());
    }

    #[test]
    fn significant_cold_points_exempt_from_gap_decimation() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 12, 31);
        let start = date(2023, 1, 1);
        let days = 800;
        let mut values = vec![10_000u64; days];
        // A spike deep in the cold tier, days 400 and 401 from start
        // (mid-2024 is still before the cold boundary of 2024-12-31).
        values[400] = 12_000;
        values[401] = 10_000;
        let series = daily_series(start, &values);

        let result = compact_series(&series, reference, &policy);
        assert!(result.contains(&series[400]), "cold spike dropped");
        assert!(result.contains(&series[401]), "cold recovery dropped");
        // The spike's neighbors are closer than the cold gap, proving the
        // exemption rather than gap luck kept them.
        let bounds = TierBounds::for_reference(reference, &policy);
        assert!(series[401].date < bounds.cold);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let policy = CompactionPolicy::default();
        let reference = date(2025, 6, 30);
        let mut series = daily_series(date(2025, 6, 20), &[10, 20, 30]);
        series.reverse();
        let result = compact_series(&series, reference, &policy);
        assert_eq!(result, daily_series(date(2025, 6, 20), &[10, 20, 30]));
    }

    #[test]
    fn snapshot_without_reference_date_is_noop() {
        let mut snapshot = HistorySnapshot::default();
        snapshot
            .series
            .insert("a".to_string(), daily_series(date(2020, 1, 1), &[1; 400]));
        let stats = compact_snapshot(&mut snapshot, &CompactionPolicy::default());
        assert_eq!(stats, CompactStats::default());
        assert_eq!(snapshot.series["a"].len(), 400);
    }

    #[test]
    fn snapshot_stats_count_shrunk_series() {
        let mut snapshot = HistorySnapshot {
            reference_date: Some(date(2025, 12, 31)),
            ..HistorySnapshot::default()
        };
        snapshot
            .series
            .insert("old".to_string(), daily_series(date(2025, 2, 1), &[100; 200]));
        snapshot
            .series
            .insert("recent".to_string(), daily_series(date(2025, 12, 20), &[9; 10]));

        let stats = compact_snapshot(&mut snapshot, &CompactionPolicy::default());
        assert_eq!(stats.points_before, 210);
        assert!(stats.points_after < stats.points_before);
        assert_eq!(stats.series_shrunk, 1);
        assert_eq!(snapshot.series["recent"].len(), 10);
    }
}
