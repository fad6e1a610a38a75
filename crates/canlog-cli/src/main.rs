//! Command-line control panel for the CAN bus data logger.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `status` | Show device status, or keep polling with `--watch` |
//! | `config` | Show or edit the device configuration |
//! | `files` | List, mark, download and delete log files |
//! | `control` | Start or stop logging, close the active file |
//! | `time` | Set the device clock |
//! | `token` | Manage the saved API token |
//! | `watch` | Poll status and WiFi scans until interrupted |
//! | `completions` | Generate shell completions |
//!
//! The device URL comes from `--url`, `CANLOG_URL`, or the config file at
//! `~/.config/canlog/config.toml`.

mod cli;
mod commands;
mod config;
mod format;
mod util;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{
    Globals, cmd_config, cmd_control, cmd_files, cmd_status, cmd_time, cmd_token, cmd_watch,
};
use config::Config;
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "canlog", &mut io::stdout());
        return Ok(());
    }

    // Notices are printed by the commands, so library logs stay at warn by default.
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let globals = Globals {
        url: cli.url,
        token: cli.token,
        output: cli.output,
        opts: FormatOptions::new(cli.no_color || config.no_color, cli.json),
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Status { watch } => cmd_status(&globals, watch).await,
        Commands::Config { action } => cmd_config(&globals, action).await,
        Commands::Files { action } => cmd_files(&globals, action).await,
        Commands::Control { action } => cmd_control(&globals, action).await,
        Commands::Time { action } => cmd_time(&globals, action).await,
        Commands::Token { action } => cmd_token(&globals, action),
        Commands::Watch(args) => cmd_watch(&globals, &args).await,
        Commands::Completions { .. } => Ok(()),
    }
}
