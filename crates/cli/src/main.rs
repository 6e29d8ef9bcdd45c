//! LLC replacement policy driver.
//!
//! This binary replays synthetic access patterns through the LLC model. It performs:
//! 1. **run:** Drive a workload through the configured policy and print the
//!    selected report sections, or the whole run summary as JSON.
//! 2. **config:** Print the effective configuration as JSON, ready to edit and
//!    pass back with `--config`.
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` (default `info`).

mod workload;

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llcrepl_core::cache::LlcStats;
use llcrepl_core::common::ConfigError;
use llcrepl_core::config::PolicyKind;
use llcrepl_core::stats::{PolicyReport, REPORT_SECTIONS};
use llcrepl_core::{Config, Llc};

use crate::workload::{Generator, Workload};

#[derive(Parser, Debug)]
#[command(
    name = "llcrepl",
    author,
    version,
    about = "LLC replacement policy driver",
    long_about = "Replay a synthetic access pattern through an LLC running the SHiP-lite / streaming / DRRIP policy (or the LRU baseline) and print its statistics.\n\nExamples:\n  llcrepl run --workload mixed -n 2000000\n  llcrepl run --workload stream --policy lru --sections summary,insertion\n  llcrepl config > llc.json && llcrepl run --config llc.json --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a workload and report.
    Run {
        /// Access pattern.
        #[arg(short, long, value_enum, default_value_t = Workload::Mixed)]
        workload: Workload,

        /// Number of accesses to replay.
        #[arg(short = 'n', long, default_value_t = 1_000_000)]
        accesses: u64,

        /// JSON configuration file (defaults apply to omitted fields).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured policy.
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Override the RNG seed (policy and workload).
        #[arg(long)]
        seed: Option<u64>,

        /// Log a heartbeat every N accesses (0 disables).
        #[arg(long)]
        heartbeat: Option<u64>,

        /// Report sections to print, comma separated (default: all).
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,

        /// Print the run summary as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON.
    Config {
        /// JSON configuration file to merge over the defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    /// SHiP-lite + streaming + DRRIP.
    Ship,
    /// True LRU.
    Lru,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Ship => Self::ShipStreamDrrip,
            PolicyArg::Lru => Self::Lru,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "unknown report section `{0}` (expected one of: {list})",
        list = REPORT_SECTIONS.join(", ")
    )]
    UnknownSection(String),
}

/// Everything a run produced, as printed by `--json`.
#[derive(Debug, Serialize)]
struct RunSummary {
    workload: Workload,
    accesses: u64,
    llc: LlcStats,
    policy: PolicyReport,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            workload,
            accesses,
            config,
            policy,
            seed,
            heartbeat,
            sections,
            json,
        } => load_config(config.as_deref()).and_then(|mut cfg| {
            if let Some(policy) = policy {
                cfg.kind = policy.into();
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(interval) = heartbeat {
                cfg.heartbeat_interval = interval;
            }
            cmd_run(&cfg, workload, accesses, &sections, json)
        }),
        Commands::Config { config } => load_config(config.as_deref()).and_then(|cfg| {
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(())
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Installs the stderr log subscriber, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads and validates a configuration file, or returns the defaults.
fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_json(&text)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Replays `accesses` accesses of `workload` and prints the outcome.
fn cmd_run(
    config: &Config,
    workload: Workload,
    accesses: u64,
    sections: &[String],
    json: bool,
) -> Result<(), CliError> {
    if let Some(bad) = sections
        .iter()
        .find(|s| !REPORT_SECTIONS.contains(&s.as_str()))
    {
        return Err(CliError::UnknownSection(bad.clone()));
    }

    let mut llc = Llc::new(config)?;
    let generator = Generator::new(workload, &config.geometry, config.seed);

    info!(?workload, accesses, "replay started");
    for access in generator.take(accesses as usize) {
        let _ = llc.access(0, access.pc, access.addr, access.kind);
    }

    let stats = *llc.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        bypasses = stats.bypasses,
        "replay finished"
    );

    if json {
        let summary = RunSummary {
            workload,
            accesses,
            llc: stats,
            policy: llc.report(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        llc.report().print_sections(sections);
        println!(
            "LLC: accesses={} hits={} misses={} bypasses={} evictions={}",
            stats.accesses, stats.hits, stats.misses, stats.bypasses, stats.evictions
        );
    }
    Ok(())
}
