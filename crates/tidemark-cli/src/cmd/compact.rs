//! `tide compact` — re-run tiered compaction over an existing snapshot.
//!
//! Useful after a policy change or an archive import. `--as-of` overrides the
//! snapshot's reference date, and `--output` writes the result elsewhere so a
//! recompaction can be previewed next to the live snapshot.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tidemark_core::compact::compact_snapshot;
use tidemark_core::error::ErrorCode;
use tidemark_core::store;

use crate::output::{CliError, OutputMode, human_kv, render, render_error};

/// Arguments for `tide compact`.
#[derive(Args, Debug)]
pub struct CompactArgs {
    /// Compute tier boundaries as of this day instead of the snapshot's
    /// reference date.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,

    /// Write the compacted snapshot here instead of replacing the original.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Output payload for `tide compact`.
#[derive(Debug, Serialize)]
pub struct CompactOutput {
    pub reference_date: NaiveDate,
    pub points_before: usize,
    pub points_after: usize,
    pub series_shrunk: usize,
    pub dry_run: bool,
    pub output_path: String,
}

/// Execute `tide compact`.
pub fn run_compact(args: &CompactArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = super::load_config_or_report(output, project_root)?;

    let snapshot_path = config.paths.history_in(project_root);
    let mut snapshot = store::load_snapshot(&snapshot_path);

    let Some(reference_date) = args.as_of.or(snapshot.reference_date) else {
        render_error(output, &CliError::from_code(ErrorCode::MissingReferenceDate))?;
        anyhow::bail!("no reference date available");
    };
    snapshot.reference_date = Some(reference_date);

    let stats = compact_snapshot(&mut snapshot, &config.compaction);

    let target = args.output.clone().unwrap_or(snapshot_path);
    if !args.dry_run {
        if let Err(err) = store::save_snapshot(&target, &snapshot) {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::PersistenceFailed, err.to_string()),
            )?;
            return Err(err);
        }
    }

    let payload = CompactOutput {
        reference_date,
        points_before: stats.points_before,
        points_after: stats.points_after,
        series_shrunk: stats.series_shrunk,
        dry_run: args.dry_run,
        output_path: target.display().to_string(),
    };

    render(output, &payload, |p, w| {
        human_kv(w, "reference date", p.reference_date.to_string())?;
        human_kv(
            w,
            "points",
            format!("{} -> {}", p.points_before, p.points_after),
        )?;
        human_kv(w, "series shrunk", p.series_shrunk.to_string())?;
        if p.dry_run {
            writeln!(w, "dry run: nothing persisted")?;
        } else {
            human_kv(w, "output", &p.output_path)?;
        }
        Ok(())
    })
}
