//! Snapshot persistence.
//!
//! The store owns the on-disk representation. Reads are forgiving: a missing
//! or unreadable snapshot degrades to the empty snapshot so the pipeline can
//! start fresh, and individual malformed sample points are dropped without
//! failing the rest of the file. Writes are strict: serialization is
//! deterministic (stable key order, tab indentation, trailing newline) and
//! goes through a temporary sibling file that is atomically renamed over the
//! target, so a crash never leaves a truncated snapshot behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use crate::model::point::normalize_series;
use crate::model::{HistorySnapshot, SamplePoint};

/// Load the snapshot at `path`, or the empty snapshot if it is missing or
/// unparseable. Never fails.
#[must_use]
pub fn load_snapshot(path: &Path) -> HistorySnapshot {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read snapshot, starting fresh"
                );
            }
            return HistorySnapshot::default();
        }
    };

    match parse_snapshot(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to parse snapshot, starting fresh"
            );
            HistorySnapshot::default()
        }
    }
}

/// Persist the snapshot at `path`, replacing any prior file.
///
/// # Errors
///
/// Returns an error if serialization or any filesystem step fails; the prior
/// snapshot is left intact in that case.
pub fn save_snapshot(path: &Path, snapshot: &HistorySnapshot) -> Result<()> {
    write_json_atomic(path, snapshot)
}

/// Serialize `value` deterministically and atomically replace `path`.
///
/// Tab indentation and a trailing newline match the artifacts the directory
/// page consumes. Parent directories are created automatically.
///
/// # Errors
///
/// Returns an error if encoding or file I/O fails.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .with_context(|| format!("serialize artifact for {}", path.display()))?;
    buf.push(b'\n');

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &buf).with_context(|| format!("write temporary file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("replace {} with {}", path.display(), tmp.display()))?;

    Ok(())
}

// Raw shape used for lenient parsing: points arrive as arbitrary JSON values
// so one bad entry cannot poison the series around it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    reference_date: Option<String>,
    #[serde(default)]
    series: BTreeMap<String, Vec<JsonValue>>,
}

fn parse_snapshot(raw: &str) -> Result<HistorySnapshot> {
    let raw: RawSnapshot = serde_json::from_str(raw).context("snapshot is not valid JSON")?;

    let reference_date = raw.reference_date.as_deref().and_then(|value| {
        let parsed = value.parse::<NaiveDate>();
        if parsed.is_err() {
            warn!(value, "ignoring unparseable reference date");
        }
        parsed.ok()
    });

    let mut series = BTreeMap::new();
    for (entity_id, entries) in raw.series {
        let mut points: Vec<SamplePoint> = Vec::with_capacity(entries.len());
        let mut dropped = 0usize;
        for entry in &entries {
            match parse_point(entry) {
                Some(point) => points.push(point),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                entity = entity_id.as_str(),
                dropped, "dropped malformed sample points"
            );
        }
        normalize_series(&mut points);
        series.insert(entity_id, points);
    }

    Ok(HistorySnapshot {
        reference_date,
        series,
    })
}

fn parse_point(entry: &JsonValue) -> Option<SamplePoint> {
    let date = entry.get("date")?.as_str()?.parse::<NaiveDate>().ok()?;
    let value = entry.get("value")?.as_u64()?;
    Some(SamplePoint::new(date, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = load_snapshot(&dir.path().join("history.json"));
        assert_eq!(snapshot, HistorySnapshot::default());
    }

    #[test]
    fn garbage_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "not json at all").expect("write");
        assert_eq!(load_snapshot(&path), HistorySnapshot::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");

        let mut snapshot = HistorySnapshot {
            reference_date: Some(day(2)),
            ..HistorySnapshot::default()
        };
        snapshot.series.insert(
            "UCabc".to_string(),
            vec![
                SamplePoint::new(day(1), 500),
                SamplePoint::new(day(2), 510),
            ],
        );

        save_snapshot(&path, &snapshot).expect("save");
        assert_eq!(load_snapshot(&path), snapshot);
    }

    #[test]
    fn output_is_tab_indented_with_trailing_newline() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        let snapshot = HistorySnapshot {
            reference_date: Some(day(1)),
            ..HistorySnapshot::default()
        };
        save_snapshot(&path, &snapshot).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with("{\n\t\"referenceDate\""));
        assert!(raw.ends_with("}\n"));
    }

    #[test]
    fn malformed_points_dropped_individually() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{
	"referenceDate": "2025-06-02",
	"series": {
		"UCabc": [
			{"date": "2025-06-01", "value": 500},
			{"date": "junk", "value": 501},
			{"date": "2025-06-02", "value": "many"},
			{"date": "2025-06-02", "value": 502}
		]
	}
}"#,
        )
        .expect("write");

        let snapshot = load_snapshot(&path);
        assert_eq!(
            snapshot.series["UCabc"],
            vec![
                SamplePoint::new(day(1), 500),
                SamplePoint::new(day(2), 502),
            ]
        );
    }

    #[test]
    fn bad_reference_date_ignored_but_series_kept() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"referenceDate": "someday", "series": {"a": [{"date": "2025-06-01", "value": 1}]}}"#,
        )
        .expect("write");

        let snapshot = load_snapshot(&path);
        assert_eq!(snapshot.reference_date, None);
        assert_eq!(snapshot.series["a"].len(), 1);
    }

    #[test]
    fn save_replaces_prior_content_entirely() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");

        let mut first = HistorySnapshot::default();
        first
            .series
            .insert("gone".to_string(), vec![SamplePoint::new(day(1), 1)]);
        save_snapshot(&path, &first).expect("save first");

        let second = HistorySnapshot::default();
        save_snapshot(&path, &second).expect("save second");

        let loaded = load_snapshot(&path);
        assert!(!loaded.series.contains_key("gone"));
    }

    #[test]
    fn no_temporary_file_left_behind() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        save_snapshot(&path, &HistorySnapshot::default()).expect("save");
        assert!(!dir.path().join("history.tmp").exists());
    }
}
