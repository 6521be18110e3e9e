//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `tcprobe scan <hosts>` - Probe ports on one or more hosts
//! - `tcprobe history [host]` - View stored host reports
//! - `tcprobe config show|init` - Inspect or create the settings file

mod config;
mod history;
mod scan;

pub use config::ConfigCommand;
pub use history::HistoryCommand;
pub use scan::{ScanCommand, TerminalSink};

use crate::config::AppSettings;
use crate::error::CliResult;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// tcprobe - TCP port-state prober.
///
/// Sends one crafted ACK, FIN, NULL or SYN probe per port and reports
/// which ports are open, filtered, or open|filtered.
#[derive(Parser, Debug)]
#[command(name = "tcprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TCP port-state prober using raw ACK/FIN/NULL/SYN probes", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH", env = "TCPROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe ports on one or more hosts
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// View stored host reports
    #[command(alias = "h")]
    History(HistoryCommand),

    /// Show or initialise settings
    Config(ConfigCommand),
}

impl Cli {
    /// Load settings and run the selected subcommand.
    pub async fn run(self) -> CliResult<()> {
        if let Commands::Config(command) = &self.command {
            // Runs before loading so a broken settings file can be inspected and replaced.
            return command.execute(self.config.as_deref());
        }

        let settings = AppSettings::resolve(self.config.as_deref())?;
        match &self.command {
            Commands::Scan(command) => command.execute(&settings, self.quiet).await,
            Commands::History(command) => command.execute(),
            Commands::Config(_) => Ok(()),
        }
    }
}

/// Output format for results.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanMode;

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::try_parse_from([
            "tcprobe", "scan", "10.0.0.1,web.lan", "-m", "fin", "-p", "22,80-82", "-w", "4", "-o",
            "csv", "--no-save",
        ])
        .unwrap();

        let Commands::Scan(scan) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(scan.hosts, "10.0.0.1,web.lan");
        assert_eq!(scan.mode, Some(ScanMode::Fin));
        assert_eq!(scan.ports.as_deref(), Some("22,80-82"));
        assert_eq!(scan.workers, Some(4));
        assert_eq!(scan.output, Some(OutputFormat::Csv));
        assert!(scan.no_save);
    }

    #[test]
    fn test_scan_defaults_are_deferred_to_settings() {
        let cli = Cli::try_parse_from(["tcprobe", "-q", "scan", "localhost"]).unwrap();
        assert!(cli.quiet);
        let Commands::Scan(scan) = cli.command else {
            panic!("expected scan command");
        };
        assert!(scan.mode.is_none());
        assert!(scan.ports.is_none());
        assert!(scan.output.is_none());
    }

    #[test]
    fn test_history_arguments() {
        let cli = Cli::try_parse_from(["tcprobe", "history", "10.0.0.1", "-n", "3"]).unwrap();
        let Commands::History(history) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(history.host.as_deref(), Some("10.0.0.1"));
        assert_eq!(history.count, 3);
        assert!(history.prune.is_none());
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["tcprobe"]).is_err());
    }

    #[test]
    fn test_output_format_serde() {
        assert_eq!(serde_json::to_string(&OutputFormat::Csv).unwrap(), "\"csv\"");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
