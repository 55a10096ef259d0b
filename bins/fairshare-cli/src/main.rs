//! fairshare-cli: replay pool scenarios against in-memory collaborators.
//!
//! `simulate` runs a JSON script of channel operations and prints the final
//! pool snapshot. `config` prints the effective pool configuration after
//! layering the config file and `FAIRSHARE_*` environment variables.

mod script;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fairshare_pool::PoolConfig;
use tracing::info;

use crate::script::Script;

/// Fairshare pool simulator.
#[derive(Parser)]
#[command(name = "fairshare-cli")]
#[command(version, about = "Replay channel pool scenarios and inspect fair-share state.")]
struct Cli {
    /// Pool config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a simulation script and print the final snapshot as JSON.
    Simulate(SimulateArgs),
    /// Print the effective pool configuration as JSON.
    Config,
}

#[derive(Args)]
struct SimulateArgs {
    /// Path to the JSON script.
    script: PathBuf,

    /// Record rejected steps and continue instead of stopping.
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = PoolConfig::load(cli.config.as_deref()).context("failed to load pool config")?;

    match cli.command {
        Commands::Simulate(args) => simulate(args, config),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn simulate(args: SimulateArgs, config: PoolConfig) -> Result<()> {
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let script = Script::from_json(&text)?;
    info!(path = %args.script.display(), steps = script.operations.len(), "running simulation");

    let report = script.run(config, args.keep_going)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr so stdout stays machine-readable.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
