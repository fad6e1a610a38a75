//! CLI argument definitions using clap.

use std::path::PathBuf;

use canlog_types::{Bitrate, FileFilter};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canlog")]
#[command(author, version, about = "Control panel for the CAN bus data logger", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Device base URL (e.g. http://192.168.4.1), or use CANLOG_URL env var
    #[arg(short, long, global = true, env = "CANLOG_URL")]
    pub url: Option<String>,

    /// API token for this invocation only, or use CANLOG_TOKEN env var
    #[arg(long, global = true, env = "CANLOG_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device status (WiFi, storage, logging, CAN counters)
    Status {
        /// Keep polling and print each update
        #[arg(short, long)]
        watch: bool,
    },

    /// Show or edit the device configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List and act on log files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },

    /// Start or stop logging, or close the active file
    Control {
        #[command(subcommand)]
        action: ControlAction,
    },

    /// Set the device clock
    Time {
        #[command(subcommand)]
        action: TimeAction,
    },

    /// Manage the saved API token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Poll status and WiFi scans until interrupted
    Watch(WatchArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Status poll period in seconds
    #[arg(long, default_value = "5")]
    pub interval: u64,

    /// WiFi scan period in seconds
    #[arg(long, default_value = "15")]
    pub scan_interval: u64,
}

impl Default for WatchArgs {
    fn default() -> Self {
        Self {
            interval: 5,
            scan_interval: 15,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the device configuration
    Show {
        /// Also wait for a WiFi scan and list nearby networks
        #[arg(long)]
        networks: bool,
    },

    /// Edit the device configuration and save it
    Set(ConfigSetArgs),

    /// Show or save the default device URL
    Url {
        /// URL to save; prints the saved URL when omitted
        #[arg(value_name = "URL")]
        address: Option<String>,
    },

    /// Show the CLI config file path
    Path,
}

/// Edits applied to the loaded configuration before saving.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigSetArgs {
    /// Bus to edit
    #[arg(long)]
    pub bus: Option<u8>,

    /// Enable or disable the bus
    #[arg(long, requires = "bus")]
    pub enabled: Option<bool>,

    /// Bus bitrate in bit/s (125000, 250000, 500000, 1000000)
    #[arg(long, requires = "bus", value_parser = parse_bitrate)]
    pub bitrate: Option<Bitrate>,

    /// Listen-only mode for the bus
    #[arg(long, requires = "bus")]
    pub read_only: Option<bool>,

    /// Log frames from the bus
    #[arg(long, requires = "bus")]
    pub logging: Option<bool>,

    /// Bus display name
    #[arg(long, requires = "bus")]
    pub name: Option<String>,

    /// WiFi slot to edit (1-3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub wifi_slot: Option<u8>,

    /// SSID for the WiFi slot (empty clears the slot)
    #[arg(long, requires = "wifi_slot")]
    pub ssid: Option<String>,

    /// Password for the WiFi slot
    #[arg(long, requires = "wifi_slot")]
    pub password: Option<String>,

    /// Join WiFi networks as a station
    #[arg(long)]
    pub sta: Option<bool>,

    /// Rotate log files at this size (MB)
    #[arg(long)]
    pub max_file_mb: Option<i64>,

    /// Stop logging below this much free space (MB)
    #[arg(long)]
    pub low_space_mb: Option<i64>,

    /// Upload endpoint URL
    #[arg(long)]
    pub upload_url: Option<String>,

    /// Sync the device clock from the CAN bus
    #[arg(long)]
    pub time_sync: Option<bool>,
}

/// Files picked for a batch action.
#[derive(Debug, Clone, Args)]
pub struct FileTargets {
    /// File ids
    #[arg(required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Act on every listed file
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,

    /// Only list files from this bus ("all" or 0-5)
    #[arg(long, default_value = "all")]
    pub bus: FileFilter,
}

#[derive(Subcommand)]
pub enum FilesAction {
    /// List log files
    List {
        /// Only list files from this bus ("all" or 0-5)
        #[arg(long, default_value = "all")]
        bus: FileFilter,
    },

    /// Mark files as downloaded
    Mark(FileTargets),

    /// Download files into a directory
    Download {
        #[command(flatten)]
        targets: FileTargets,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Delete files from the device
    Delete {
        #[command(flatten)]
        targets: FileTargets,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ControlAction {
    /// Start logging
    Start,
    /// Stop logging
    Stop,
    /// Close the file currently being written
    Close,
}

#[derive(Subcommand)]
pub enum TimeAction {
    /// Set the clock from RFC 3339 or "YYYY-MM-DD HH:MM[:SS]" (UTC)
    Set {
        /// Time to set
        value: String,
    },
    /// Set the clock to this machine's current time
    Now,
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Save a token used for every request
    Set {
        /// Token value
        value: String,
    },
    /// Print the saved token
    Show {
        /// Print the full token instead of a masked one
        #[arg(long)]
        reveal: bool,
    },
    /// Remove the saved token
    Clear,
}

fn parse_bitrate(s: &str) -> Result<Bitrate, String> {
    let bps: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    Bitrate::try_from(bps).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bitrate() {
        assert_eq!(parse_bitrate("250000").unwrap(), Bitrate::Kbps250);
        assert!(parse_bitrate("300000").is_err());
        assert!(parse_bitrate("fast").is_err());
    }

    #[test]
    fn test_config_set_args() {
        let cli = Cli::try_parse_from([
            "canlog",
            "config",
            "set",
            "--bus",
            "1",
            "--enabled",
            "true",
            "--bitrate",
            "1000000",
            "--wifi-slot",
            "2",
            "--ssid",
            "depot",
        ])
        .unwrap();
        let Commands::Config {
            action: ConfigAction::Set(args),
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(args.bus, Some(1));
        assert_eq!(args.enabled, Some(true));
        assert_eq!(args.bitrate, Some(Bitrate::Mbps1));
        assert_eq!(args.wifi_slot, Some(2));
        assert_eq!(args.ssid.as_deref(), Some("depot"));
    }

    #[test]
    fn test_bus_edits_require_bus() {
        assert!(Cli::try_parse_from(["canlog", "config", "set", "--enabled", "true"]).is_err());
        assert!(Cli::try_parse_from(["canlog", "config", "set", "--wifi-slot", "4"]).is_err());
    }

    #[test]
    fn test_file_targets() {
        let cli = Cli::try_parse_from(["canlog", "files", "delete", "--all", "--bus", "2", "-y"])
            .unwrap();
        let Commands::Files {
            action: FilesAction::Delete { targets, yes },
        } = cli.command
        else {
            panic!("expected files delete");
        };
        assert!(targets.all);
        assert!(yes);
        assert_eq!(targets.bus, FileFilter::Bus(2));

        assert!(Cli::try_parse_from(["canlog", "files", "mark"]).is_err());
        assert!(Cli::try_parse_from(["canlog", "files", "mark", "3", "--all"]).is_err());
    }
}
