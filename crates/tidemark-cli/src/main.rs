#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tidemark: subscriber-history retention and ranking engine",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize a tidemark project",
        long_about = "Write a default tidemark.toml and an empty entity catalog in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    tide init\n\n    # Emit machine-readable output\n    tide init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "Fetch counts, ingest, rank, compact, and persist",
        long_about = "Run the full pipeline: fetch subscriber counts for every catalog entity, \
                      upsert today's samples into the snapshot, compute rank movement against the \
                      previous observation, compact every series, and persist all artifacts.",
        after_help = "EXAMPLES:\n    # Daily batch run\n    tide update\n\n    # See what would change without writing\n    tide update --dry-run"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        about = "Recompact the history snapshot",
        long_about = "Re-run tiered compaction over an existing snapshot without fetching anything.",
        after_help = "EXAMPLES:\n    # Compact in place using the snapshot's own reference date\n    tide compact\n\n    # Preview against a different as-of day, writing elsewhere\n    tide compact --as-of 2025-06-01 --output history.compacted.json"
    )]
    Compact(cmd::compact::CompactArgs),

    #[command(
        about = "Recompute the rank diff artifact",
        long_about = "Derive current and previous rankings from the snapshot and write the rank \
                      diff artifact consumed by the directory page.",
        after_help = "EXAMPLES:\n    tide rank\n    tide rank --json"
    )]
    Rank(cmd::rank::RankArgs),

    #[command(
        about = "Import a legacy CSV archive into the snapshot",
        long_about = "One-time migration: convert a spreadsheet export (one row per entity, one \
                      dated column per observation) into a fresh history snapshot.",
        after_help = "EXAMPLES:\n    tide import Archive.csv"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        about = "Summarize catalog and snapshot state",
        after_help = "EXAMPLES:\n    tide status\n    tide status --json"
    )]
    Status(cmd::status::StatusArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIDEMARK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tidemark_core=debug,tidemark_cli=debug,info"
        } else {
            "info"
        })
    });

    let format = env::var("TIDEMARK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, output, &project_root),
        Commands::Update(args) => cmd::update::run_update(&args, output, &project_root),
        Commands::Compact(args) => cmd::compact::run_compact(&args, output, &project_root),
        Commands::Rank(args) => cmd::rank::run_rank(&args, output, &project_root),
        Commands::Import(args) => cmd::import::run_import(&args, output, &project_root),
        Commands::Status(args) => cmd::status::run_status(&args, output, &project_root),
    }
}
