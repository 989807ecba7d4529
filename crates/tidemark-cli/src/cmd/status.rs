//! `tide status` — read-only summary of catalog and snapshot state.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tidemark_core::catalog::Catalog;
use tidemark_core::compact::TierBounds;
use tidemark_core::store;
use tracing::warn;

use crate::output::{OutputMode, human_kv, render};

/// Arguments for `tide status`.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Output payload for `tide status`.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub entities: usize,
    pub tracked_series: usize,
    pub total_points: usize,
    pub reference_date: Option<String>,
    pub hot_points: usize,
    pub warm_points: usize,
    pub cold_points: usize,
}

/// Execute `tide status`.
pub fn run_status(_args: &StatusArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = super::load_config_or_report(output, project_root)?;

    let catalog = Catalog::load(&config.paths.catalog_in(project_root)).unwrap_or_else(|err| {
        warn!(error = %err, "catalog unavailable, reporting zero entities");
        Catalog::default()
    });
    let snapshot = store::load_snapshot(&config.paths.history_in(project_root));

    let (mut hot, mut warm, mut cold) = (0usize, 0usize, 0usize);
    if let Some(reference_date) = snapshot.reference_date {
        let bounds = TierBounds::for_reference(reference_date, &config.compaction);
        for point in snapshot.series.values().flatten() {
            if point.date >= bounds.hot {
                hot += 1;
            } else if point.date >= bounds.cold {
                warm += 1;
            } else {
                cold += 1;
            }
        }
    }

    let payload = StatusOutput {
        entities: catalog.entities.len(),
        tracked_series: snapshot.populated_series(),
        total_points: snapshot.total_points(),
        reference_date: snapshot.reference_date.map(|d| d.to_string()),
        hot_points: hot,
        warm_points: warm,
        cold_points: cold,
    };

    render(output, &payload, |p, w| {
        human_kv(w, "entities", p.entities.to_string())?;
        human_kv(w, "tracked series", p.tracked_series.to_string())?;
        human_kv(w, "total points", p.total_points.to_string())?;
        human_kv(
            w,
            "reference date",
            p.reference_date.as_deref().unwrap_or("(never ingested)"),
        )?;
        human_kv(
            w,
            "tiers",
            format!(
                "{} hot / {} warm / {} cold",
                p.hot_points, p.warm_points, p.cold_points
            ),
        )?;
        Ok(())
    })
}
