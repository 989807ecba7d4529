//! `tide rank` — recompute the rank diff artifact from the snapshot alone.
//!
//! The current ranking comes from each series' latest sample, the previous
//! ranking from the sample before it. A missing snapshot is not an error: the
//! artifact is written empty so the directory page renders without badges.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tidemark_core::error::ErrorCode;
use tidemark_core::model::RankShift;
use tidemark_core::rank;
use tidemark_core::store;
use tracing::info;

use crate::output::{CliError, OutputMode, human_kv, render, render_error};

/// Arguments for `tide rank`.
#[derive(Args, Debug)]
pub struct RankArgs {}

/// Output payload for `tide rank`.
#[derive(Debug, Serialize)]
pub struct RankOutput {
    pub entries: usize,
    pub new_entities: usize,
    pub output_path: String,
}

/// Execute `tide rank`.
pub fn run_rank(_args: &RankArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = super::load_config_or_report(output, project_root)?;

    let snapshot = store::load_snapshot(&config.paths.history_in(project_root));
    if snapshot.series.is_empty() {
        info!("snapshot empty, writing empty rank artifact");
    }

    let shifts = rank::rank_shifts(
        rank::latest_observations(&snapshot),
        rank::previous_observations(&snapshot),
    );
    let new_entities = shifts
        .values()
        .filter(|shift| matches!(shift, RankShift::New))
        .count();

    let target = config.paths.rank_diff_in(project_root);
    if let Err(err) = store::write_json_atomic(&target, &shifts) {
        render_error(
            output,
            &CliError::with_detail(ErrorCode::PersistenceFailed, err.to_string()),
        )?;
        return Err(err);
    }

    let payload = RankOutput {
        entries: shifts.len(),
        new_entities,
        output_path: target.display().to_string(),
    };

    render(output, &payload, |p, w| {
        human_kv(w, "rank entries", p.entries.to_string())?;
        human_kv(w, "new entities", p.new_entities.to_string())?;
        human_kv(w, "output", &p.output_path)?;
        Ok(())
    })
}
