//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and renders its result
//! accordingly: readable text for terminals, stable JSON for scripts and the
//! site build. Errors go through [`render_error`] so both modes surface the
//! same stable error code and hint.

use std::io::{self, Write};

use serde::Serialize;
use tidemark_core::error::ErrorCode;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-oriented text.
    Human,
    /// Machine-readable JSON, one object per command.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render a command result: JSON straight to stdout, or the provided
/// human formatter.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human(value, &mut out)?,
    }
    Ok(())
}

/// Error payload rendered to stderr on fatal failures.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl CliError {
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            error: code.message().to_string(),
            code: Some(code.code()),
            hint: code.hint(),
        }
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            error: format!("{}: {}", code.message(), detail.into()),
            code: Some(code.code()),
            hint: code.hint(),
        }
    }
}

/// Write an error payload to stderr in the active output mode.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    if mode.is_json() {
        serde_json::to_writer(&mut out, error)?;
        writeln!(out)?;
    } else {
        match error.code {
            Some(code) => writeln!(out, "error[{code}]: {}", error.error)?,
            None => writeln!(out, "error: {}", error.error)?,
        }
        if let Some(hint) = error.hint {
            writeln!(out, "  hint: {hint}")?;
        }
    }
    Ok(())
}

/// Render a left-aligned key/value line in human output.
pub fn human_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<18} {}", format!("{key}:"), value.as_ref())
}
