//! VfxBin CLI - Command-line interface for ritobin VFX editing

pub mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;

use crate::config::EngineConfig;

#[derive(Parser)]
#[command(name = "vfxbin")]
#[command(about = "VfxBin: index, inspect and edit League of Legends VFX bins", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Run the VfxBin CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging (RUST_LOG=vfxbin=debug for edit details)
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_or_default()?,
    };
    cli.command.execute(&config)?;

    Ok(())
}
