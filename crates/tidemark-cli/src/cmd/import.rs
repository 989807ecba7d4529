//! `tide import` — one-time migration of a legacy spreadsheet export.
//!
//! The archive CSV has one header row (`name,date,date,…`, dates with `/` or
//! `-` separators) and one row per entity, values under the date columns.
//! Rows are matched to catalog entries by name; the resulting snapshot's
//! reference date is the newest header date.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tidemark_core::catalog::Catalog;
use tidemark_core::error::ErrorCode;
use tidemark_core::model::{HistorySnapshot, SamplePoint};
use tidemark_core::store;
use tracing::warn;

use crate::output::{CliError, OutputMode, human_kv, render, render_error};

/// Arguments for `tide import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the archive CSV.
    pub archive: PathBuf,

    /// Write the snapshot here instead of the configured history path.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Output payload for `tide import`.
#[derive(Debug, Serialize)]
pub struct ImportOutput {
    pub reference_date: NaiveDate,
    pub entities_imported: usize,
    pub points_imported: usize,
    pub rows_skipped: usize,
    pub output_path: String,
}

/// Execute `tide import`.
pub fn run_import(args: &ImportArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = super::load_config_or_report(output, project_root)?;

    let catalog_path = config.paths.catalog_in(project_root);
    let catalog = match Catalog::load(&catalog_path) {
        Ok(catalog) => catalog,
        Err(err) => {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::CatalogUnreadable, err.to_string()),
            )?;
            return Err(err.into());
        }
    };

    let csv_text = fs::read_to_string(&args.archive)
        .with_context(|| format!("read archive {}", args.archive.display()))?;

    let parsed = match parse_archive(&csv_text, &catalog) {
        Ok(parsed) => parsed,
        Err(err) => {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::ArchiveParseError, err.to_string()),
            )?;
            return Err(err);
        }
    };

    let target = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.history_in(project_root));
    if let Err(err) = store::save_snapshot(&target, &parsed.snapshot) {
        render_error(
            output,
            &CliError::with_detail(ErrorCode::PersistenceFailed, err.to_string()),
        )?;
        return Err(err);
    }

    let payload = ImportOutput {
        reference_date: parsed.reference_date,
        entities_imported: parsed.entities_imported,
        points_imported: parsed.points_imported,
        rows_skipped: parsed.rows_skipped,
        output_path: target.display().to_string(),
    };

    render(output, &payload, |p, w| {
        human_kv(w, "reference date", p.reference_date.to_string())?;
        human_kv(w, "entities", p.entities_imported.to_string())?;
        human_kv(w, "points", p.points_imported.to_string())?;
        if p.rows_skipped > 0 {
            writeln!(w, "skipped {} rows with no catalog match", p.rows_skipped)?;
        }
        human_kv(w, "output", &p.output_path)?;
        Ok(())
    })
}

struct ParsedArchive {
    snapshot: HistorySnapshot,
    reference_date: NaiveDate,
    entities_imported: usize,
    points_imported: usize,
    rows_skipped: usize,
}

/// Convert the CSV text into a fresh snapshot using `catalog` to resolve row
/// names to entity ids.
fn parse_archive(csv_text: &str, catalog: &Catalog) -> Result<ParsedArchive> {
    let rows: Vec<&str> = csv_text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();

    let Some((header, body)) = rows.split_first() else {
        bail!("archive is empty");
    };

    let dates = parse_header_dates(header)?;
    let Some(reference_date) = dates.iter().max().copied() else {
        bail!("archive header has no date columns");
    };

    // First catalog entry wins for a given name, like the directory itself.
    let mut name_to_id: BTreeMap<&str, String> = BTreeMap::new();
    for entity in &catalog.entities {
        let name = entity.name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(id) = entity.entity_id()
            && !name_to_id.contains_key(name)
        {
            name_to_id.insert(name, id);
        }
    }

    let mut series: BTreeMap<String, Vec<SamplePoint>> = BTreeMap::new();
    let mut used_names: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut points_imported = 0usize;
    let mut rows_skipped = 0usize;

    for row in body {
        let fields: Vec<&str> = row.split(',').collect();
        let name = fields.first().map_or("", |f| f.trim());
        if name.is_empty() || used_names.contains(name) {
            rows_skipped += 1;
            continue;
        }

        let Some(id) = name_to_id.get(name) else {
            warn!(name, "archive row has no catalog entry");
            rows_skipped += 1;
            continue;
        };
        used_names.insert(name);

        let mut points = Vec::new();
        for (j, &date) in dates.iter().enumerate() {
            let Some(raw) = fields.get(j + 1) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let Ok(value) = raw.parse::<f64>() else {
                continue;
            };
            if !value.is_finite() || value < 0.0 {
                continue;
            }
            points.push(SamplePoint::new(date, value.round() as u64));
            points_imported += 1;
        }
        points.sort_by_key(|point| point.date);
        series.insert(id.clone(), points);
    }

    let entities_imported = series.len();

    // Catalog entities the archive never mentioned still get a series, so
    // the first update run finds every entity in place.
    for id in catalog.unique_ids() {
        series.entry(id).or_default();
    }

    let snapshot = HistorySnapshot {
        reference_date: Some(reference_date),
        series,
    };

    Ok(ParsedArchive {
        snapshot,
        reference_date,
        entities_imported,
        points_imported,
        rows_skipped,
    })
}

fn parse_header_dates(header: &str) -> Result<Vec<NaiveDate>> {
    header
        .split(',')
        .skip(1)
        .map(|raw| {
            let normalized = raw.trim().replace('/', "-");
            normalized
                .parse::<NaiveDate>()
                .with_context(|| format!("unparseable header date {raw:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::catalog::Entity;

    fn catalog() -> Catalog {
        Catalog {
            entities: vec![
                Entity {
                    name: "Alpha".to_string(),
                    url: "https://x.test/channel/UC-alpha".to_string(),
                    ..Entity::default()
                },
                Entity {
                    name: "Beta".to_string(),
                    url: "https://x.test/channel/UC-beta".to_string(),
                    ..Entity::default()
                },
            ],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn imports_rows_matched_by_name() {
        let csv = "name,2024/01/01,2024/02/01\nAlpha,100,110\nBeta,50,\n";
        let parsed = parse_archive(csv, &catalog()).expect("parse");

        assert_eq!(parsed.reference_date, date(2024, 2, 1));
        assert_eq!(parsed.entities_imported, 2);
        assert_eq!(parsed.points_imported, 3);
        assert_eq!(
            parsed.snapshot.series["UC-alpha"],
            vec![
                SamplePoint::new(date(2024, 1, 1), 100),
                SamplePoint::new(date(2024, 2, 1), 110),
            ]
        );
        // Beta's blank cell is skipped, not zero-filled.
        assert_eq!(
            parsed.snapshot.series["UC-beta"],
            vec![SamplePoint::new(date(2024, 1, 1), 50)]
        );
    }

    #[test]
    fn unknown_names_are_skipped_and_counted() {
        let csv = "name,2024-01-01\nGamma,10\nAlpha,20\n";
        let parsed = parse_archive(csv, &catalog()).expect("parse");
        assert_eq!(parsed.rows_skipped, 1);
        assert_eq!(parsed.entities_imported, 1);
    }

    #[test]
    fn duplicate_rows_keep_the_first() {
        let csv = "name,2024-01-01\nAlpha,10\nAlpha,99\n";
        let parsed = parse_archive(csv, &catalog()).expect("parse");
        assert_eq!(
            parsed.snapshot.series["UC-alpha"],
            vec![SamplePoint::new(date(2024, 1, 1), 10)]
        );
    }

    #[test]
    fn fractional_values_are_rounded() {
        let csv = "name,2024-01-01\nAlpha,10.6\n";
        let parsed = parse_archive(csv, &catalog()).expect("parse");
        assert_eq!(
            parsed.snapshot.series["UC-alpha"],
            vec![SamplePoint::new(date(2024, 1, 1), 11)]
        );
    }

    #[test]
    fn unmentioned_catalog_entities_get_empty_series() {
        let csv = "name,2024-01-01\nAlpha,10\n";
        let parsed = parse_archive(csv, &catalog()).expect("parse");
        assert!(parsed.snapshot.series["UC-beta"].is_empty());
    }

    #[test]
    fn empty_archive_is_an_error() {
        assert!(parse_archive("", &catalog()).is_err());
        assert!(parse_archive("\n\n", &catalog()).is_err());
    }

    #[test]
    fn bad_header_date_is_an_error() {
        assert!(parse_archive("name,someday\nAlpha,10\n", &catalog()).is_err());
    }
}
