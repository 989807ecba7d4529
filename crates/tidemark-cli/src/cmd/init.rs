//! `tide init` — lay down a default config and an empty entity catalog.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tidemark_core::catalog::Catalog;
use tidemark_core::config::{CONFIG_FILE, ProjectConfig};

use crate::output::{OutputMode, human_kv, render};

/// Arguments for `tide init`.
#[derive(Args, Debug)]
pub struct InitArgs {}

/// Output payload for `tide init`.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub created: Vec<String>,
}

/// Execute `tide init`.
pub fn run_init(_args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config_path = project_root.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{} already exists, refusing to overwrite", CONFIG_FILE);
    }

    let mut created = Vec::new();

    let config = ProjectConfig::default();
    let rendered = toml::to_string_pretty(&config).context("serialize default config")?;
    fs::write(&config_path, rendered)
        .with_context(|| format!("write {}", config_path.display()))?;
    created.push(CONFIG_FILE.to_string());

    let catalog_path = config.paths.catalog_in(project_root);
    if !catalog_path.exists() {
        Catalog::default().save(&catalog_path)?;
        created.push(config.paths.catalog.display().to_string());
    }

    let payload = InitOutput { created };

    render(output, &payload, |p, w| {
        for path in &p.created {
            human_kv(w, "created", path)?;
        }
        Ok(())
    })
}
