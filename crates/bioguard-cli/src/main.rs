//! Command-line monitor for the Bio-Guard water analyzer.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `monitor` | Connect and render readings until Ctrl+C |
//! | `decode` | Decode one payload offline |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Settings live in `~/.config/bioguard/config.toml` (or the platform
//! equivalent). `--device` and `BIOGUARD_DEVICE` override the configured
//! device name; `NO_COLOR` disables colored output.

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod terminal;

use cli::{Cli, Commands};
use commands::{MonitorArgs, cmd_config, cmd_decode, cmd_monitor};
use config::{Config, Overrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "bioguard", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let no_color = cli.no_color || config.no_color;

    match cli.command {
        Commands::Monitor {
            device,
            interval,
            count,
        } => {
            let args = MonitorArgs {
                overrides: Overrides {
                    device: device.device,
                    interval_ms: interval,
                    timeout_secs: device.timeout,
                },
                count,
                no_color,
                quiet: cli.quiet,
            };
            cmd_monitor(args, &config).await?;
        }
        Commands::Decode { payload, format } => {
            cmd_decode(&payload, format, no_color)?;
        }
        Commands::Config { action } => {
            cmd_config(action, &config)?;
        }
        // Handled before tracing init
        Commands::Completions { .. } => {}
    }

    Ok(())
}
