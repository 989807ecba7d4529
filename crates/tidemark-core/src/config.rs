//! Project configuration: `tidemark.toml` at the project root.
//!
//! Every knob has a default so a missing file or an empty table is valid.
//! The compaction constants are policy, not structure — the engine reads them
//! from here rather than hard-coding.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tidemark.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub compaction: CompactionPolicy,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

/// Retention policy for [`crate::compact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionPolicy {
    /// Relative change against the last significant value that marks a point
    /// significant. 0.02 = 2%.
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,
    /// Age below which points are kept verbatim, in months.
    #[serde(default = "default_hot_window_months")]
    pub hot_window_months: u32,
    /// Age beyond which the coarser cold decimation applies, in months.
    #[serde(default = "default_cold_boundary_months")]
    pub cold_boundary_months: u32,
    /// Maximum days between kept non-significant points inside the warm tier.
    #[serde(default = "default_warm_max_gap_days")]
    pub warm_max_gap_days: i64,
    /// Maximum days between kept non-significant points inside the cold tier.
    #[serde(default = "default_cold_max_gap_days")]
    pub cold_max_gap_days: i64,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            significance_threshold: default_significance_threshold(),
            hot_window_months: default_hot_window_months(),
            cold_boundary_months: default_cold_boundary_months(),
            warm_max_gap_days: default_warm_max_gap_days(),
            cold_max_gap_days: default_cold_max_gap_days(),
        }
    }
}

impl CompactionPolicy {
    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending knob.
    pub fn validate(&self) -> Result<()> {
        if !self.significance_threshold.is_finite() || self.significance_threshold <= 0.0 {
            bail!(
                "compaction.significance_threshold must be a positive number, got {}",
                self.significance_threshold
            );
        }
        if self.hot_window_months == 0 {
            bail!("compaction.hot_window_months must be at least 1");
        }
        if self.cold_boundary_months <= self.hot_window_months {
            bail!(
                "compaction.cold_boundary_months ({}) must exceed hot_window_months ({})",
                self.cold_boundary_months,
                self.hot_window_months
            );
        }
        if self.warm_max_gap_days <= 0 || self.cold_max_gap_days <= 0 {
            bail!("compaction max gap days must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Statistics endpoint queried for subscriber counts.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Maximum entity ids per bulk lookup request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Persisted history snapshot.
    #[serde(default = "default_history_path")]
    pub history: PathBuf,
    /// Rank diff artifact consumed by the directory page.
    #[serde(default = "default_rank_diff_path")]
    pub rank_diff: PathBuf,
    /// Entity catalog (names, URLs, tags, latest counts).
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            history: default_history_path(),
            rank_diff: default_rank_diff_path(),
            catalog: default_catalog_path(),
        }
    }
}

impl PathConfig {
    #[must_use]
    pub fn history_in(&self, root: &Path) -> PathBuf {
        root.join(&self.history)
    }

    #[must_use]
    pub fn rank_diff_in(&self, root: &Path) -> PathBuf {
        root.join(&self.rank_diff)
    }

    #[must_use]
    pub fn catalog_in(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog)
    }
}

fn default_significance_threshold() -> f64 {
    0.02
}

fn default_hot_window_months() -> u32 {
    1
}

fn default_cold_boundary_months() -> u32 {
    12
}

fn default_warm_max_gap_days() -> i64 {
    30
}

fn default_cold_max_gap_days() -> i64 {
    60
}

fn default_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3/channels".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_history_path() -> PathBuf {
    PathBuf::from("history.json")
}

fn default_rank_diff_path() -> PathBuf {
    PathBuf::from("rank-diff.json")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

/// Load `tidemark.toml` from `project_root`, falling back to defaults when
/// the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: ProjectConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    config
        .compaction
        .validate()
        .with_context(|| format!("Invalid compaction policy in {}", path.display()))?;

    Ok(config)
}
