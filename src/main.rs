//! `reqprof` command line: read back and prune persisted profile records.

mod cli_logger;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use reqprof::{Heap, LogStore, ProfilerConfig, Value, render};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;

use cli_logger::CliLogger;

#[derive(Debug, Parser)]
#[command(name = "reqprof", version, about = "Inspect persisted request profiles")]
struct Cli {
    /// Config file; missing file means defaults.
    #[arg(long, default_value = "reqprof.toml")]
    config: PathBuf,

    /// Override `logdata_path` from the config.
    #[arg(long)]
    logdata_path: Option<PathBuf>,

    #[arg(long)]
    json: bool,

    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a session's records, oldest first.
    History {
        session: String,
        /// Newest N records; defaults to `history_count`, 0 for all.
        #[arg(long)]
        limit: Option<usize>,
        /// Print whole records instead of one-line summaries.
        #[arg(long)]
        full: bool,
    },
    /// Remove session directories older than the configured expiration.
    Gc,
    /// Render a JSON file with the dumper.
    Dump {
        file: PathBuf,
        #[arg(long, default_value_t = reqprof::DEFAULT_MAX_DEPTH)]
        depth: usize,
        #[arg(long)]
        highlight: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logger = CliLogger::new(cli.json, cli.no_color);
    match run(&cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let mut config = ProfilerConfig::load_optional(&cli.config);
    if let Some(path) = &cli.logdata_path {
        config.logdata_path = Some(path.clone());
    }

    match &cli.command {
        Command::History {
            session,
            limit,
            full,
        } => {
            let store = open_store(&config)?;
            let records = store.history(session, limit.unwrap_or(config.history_count))?;
            if *full {
                logger.print_serialized(&records)
            } else {
                logger.print_history(session, &records)
            }
        }
        Command::Gc => {
            let store = open_store(&config)?;
            let report = store.gc(config.expiration(), SystemTime::now());
            logger.print_serialized(&report)
        }
        Command::Dump {
            file,
            depth,
            highlight,
        } => {
            let bytes =
                std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not JSON", file.display()))?;
            let dump = render(&Value::from_json(&json), &Heap::new(), *depth, *highlight);
            logger.print_dump(&dump)
        }
    }
}

fn open_store(config: &ProfilerConfig) -> Result<LogStore> {
    let root = config
        .logdata_path()
        .context("logdata_path is not configured")?;
    Ok(LogStore::new(root))
}
