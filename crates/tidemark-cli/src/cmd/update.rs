//! `tide update` — the daily batch pipeline.
//!
//! Fetch subscriber counts for every catalog entity, write them back onto the
//! catalog, upsert today's samples into the history snapshot, compute rank
//! movement against the previous observation, compact every series, and
//! persist all three artifacts. Rank movement is derived before compaction so
//! the previous observation is still present even when it has aged out of the
//! hot window.

use std::collections::BTreeMap;
use std::env;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tidemark_core::catalog::Catalog;
use tidemark_core::compact;
use tidemark_core::error::ErrorCode;
use tidemark_core::ingest::{self, Observation};
use tidemark_core::rank;
use tidemark_core::store;
use tracing::info;

use crate::output::{CliError, OutputMode, human_kv, render, render_error};

const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Arguments for `tide update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Run the full pipeline but persist nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Ingest under this day instead of today (useful for backfills and tests).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

/// Output payload for `tide update`.
#[derive(Debug, Serialize)]
pub struct UpdateOutput {
    pub date: NaiveDate,
    pub entities: usize,
    pub entities_observed: usize,
    pub catalog_updated: usize,
    pub points_before: usize,
    pub points_after: usize,
    pub series_shrunk: usize,
    pub rank_entries: usize,
    pub dry_run: bool,
}

/// Execute `tide update`.
pub fn run_update(args: &UpdateArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = super::load_config_or_report(output, project_root)?;

    // Fail on the missing credential before any file or network I/O.
    let api_key = match env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            render_error(output, &CliError::from_code(ErrorCode::MissingCredential))?;
            anyhow::bail!("{API_KEY_ENV} is not set");
        }
    };

    let catalog_path = config.paths.catalog_in(project_root);
    let mut catalog = match Catalog::load(&catalog_path) {
        Ok(catalog) => catalog,
        Err(err) => {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::CatalogUnreadable, err.to_string()),
            )?;
            return Err(err.into());
        }
    };

    let ids = catalog.unique_ids();
    let client = StatsClient::new(config.fetch.endpoint.clone(), api_key);
    let observations = match client.fetch_all(&ids, config.fetch.batch_size) {
        Ok(observations) => observations,
        Err(err) => {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::ProviderRequestFailed, err.to_string()),
            )?;
            return Err(err);
        }
    };
    info!(
        queried = ids.len(),
        observed = observations.len(),
        "fetched subscriber counts"
    );

    let today = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let snapshot_path = config.paths.history_in(project_root);
    let mut snapshot = store::load_snapshot(&snapshot_path);

    let catalog_updated = catalog.apply_observations(&observations);
    ingest::apply_observations(&mut snapshot, today, &observations);

    let shifts = rank::rank_shifts(
        rank::latest_observations(&snapshot),
        rank::previous_observations(&snapshot),
    );

    let stats = compact::compact_snapshot(&mut snapshot, &config.compaction);

    if !args.dry_run {
        let persist = || -> Result<()> {
            catalog.save(&catalog_path)?;
            store::save_snapshot(&snapshot_path, &snapshot)?;
            store::write_json_atomic(&config.paths.rank_diff_in(project_root), &shifts)?;
            Ok(())
        };
        if let Err(err) = persist() {
            render_error(
                output,
                &CliError::with_detail(ErrorCode::PersistenceFailed, err.to_string()),
            )?;
            return Err(err);
        }
    }

    let payload = UpdateOutput {
        date: today,
        entities: catalog.entities.len(),
        entities_observed: observations.len(),
        catalog_updated,
        points_before: stats.points_before,
        points_after: stats.points_after,
        series_shrunk: stats.series_shrunk,
        rank_entries: shifts.len(),
        dry_run: args.dry_run,
    };

    render(output, &payload, |p, w| {
        human_kv(w, "date", p.date.to_string())?;
        human_kv(
            w,
            "observed",
            format!("{} / {} entities", p.entities_observed, p.entities),
        )?;
        human_kv(w, "catalog updated", p.catalog_updated.to_string())?;
        human_kv(
            w,
            "points",
            format!("{} -> {}", p.points_before, p.points_after),
        )?;
        human_kv(w, "series shrunk", p.series_shrunk.to_string())?;
        human_kv(w, "rank entries", p.rank_entries.to_string())?;
        if p.dry_run {
            writeln!(w, "dry run: nothing persisted")?;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Statistics provider client
// ---------------------------------------------------------------------------

struct StatsClient {
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    items: Vec<StatsItem>,
}

#[derive(Debug, Deserialize)]
struct StatsItem {
    id: Option<String>,
    statistics: Option<Statistics>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

impl StatsClient {
    fn new(endpoint: String, api_key: String) -> Self {
        Self { endpoint, api_key }
    }

    /// Fetch counts for all ids, `batch_size` per request. Entities the
    /// provider knows nothing about are simply absent from the result.
    fn fetch_all(&self, ids: &[String], batch_size: usize) -> Result<BTreeMap<String, Observation>> {
        let mut observations = BTreeMap::new();
        let batch_size = batch_size.max(1);
        for batch in ids.chunks(batch_size) {
            observations.extend(self.fetch_batch(batch)?);
        }
        Ok(observations)
    }

    fn fetch_batch(&self, ids: &[String]) -> Result<BTreeMap<String, Observation>> {
        let response = ureq::get(&self.endpoint)
            .query("part", "statistics,snippet")
            .query("id", &ids.join(","))
            .query("key", &self.api_key)
            .call()
            // The request URL carries the API key; report the failure without
            // echoing it.
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => {
                    anyhow!("statistics request failed with status {status}")
                }
                _ => anyhow!("statistics request failed: transport error"),
            })?;

        let payload: StatsResponse = response
            .into_json()
            .context("failed to decode statistics response")?;
        Ok(map_response(payload))
    }
}

/// Flatten the provider payload into `entity id -> observation`, skipping
/// items with no id or no parseable count.
fn map_response(payload: StatsResponse) -> BTreeMap<String, Observation> {
    let mut observations = BTreeMap::new();
    for item in payload.items {
        let Some(id) = item.id else { continue };
        let Some(value) = item
            .statistics
            .as_ref()
            .and_then(|stats| stats.subscriber_count.as_deref())
            .and_then(|raw| raw.parse::<u64>().ok())
        else {
            continue;
        };
        let icon = item
            .snippet
            .as_ref()
            .and_then(|snippet| snippet.thumbnails.as_ref())
            .and_then(|thumbs| thumbs.medium.as_ref().or(thumbs.default.as_ref()))
            .and_then(|thumb| thumb.url.clone());
        observations.insert(id, Observation { value, icon });
    }
    observations
}
