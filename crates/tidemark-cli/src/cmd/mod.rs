pub mod compact;
pub mod import;
pub mod init;
pub mod rank;
pub mod status;
pub mod update;

use std::path::Path;

use anyhow::Result;
use tidemark_core::config::{self, ProjectConfig};
use tidemark_core::error::ErrorCode;

use crate::output::{CliError, OutputMode, render_error};

/// Load `tidemark.toml`, reporting parse failures with their stable code
/// before propagating.
pub fn load_config_or_report(output: OutputMode, project_root: &Path) -> Result<ProjectConfig> {
    config::load_config(project_root).inspect_err(|err| {
        let _ = render_error(
            output,
            &CliError::with_detail(ErrorCode::ConfigParseError, format!("{err:#}")),
        );
    })
}
