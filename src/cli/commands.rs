use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kaipo_counters::config::OutputFormat;

/// Main CLI structure for the kaipo-counters application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Print cumulative per-interface network byte counters")]
#[command(long_about = "Kaipo Counters reads the operating system's cumulative received/sent byte \
counters for every active network interface, leaving out loopback, non-operational and duplicate \
interfaces. Counters are printed raw; rates are left to whatever consumes the output.")]
pub struct Cli {
    /// Configuration file (TOML); defaults to ./kaipo-counters.toml when present
    #[arg(short, long, global = true, help = "Path to a configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect once and print the result
    #[command(about = "Print the current counters once")]
    #[command(long_about = "Collects interface counters once and prints them.\n\n\
Examples:\n  \
kc snapshot                           # Aligned table\n  \
kc snapshot --format json             # Machine-readable output")]
    Snapshot {
        /// Output format, overrides the configured one
        #[arg(short, long, value_enum, help = "Output format: text or json")]
        format: Option<OutputFormat>,
    },

    /// Collect repeatedly until interrupted
    #[command(about = "Print counters on a fixed interval")]
    #[command(long_about = "Collects interface counters on a fixed interval. A collection that \
fails or exceeds the configured timeout is logged and skipped. Press Ctrl-C to stop.\n\n\
Examples:\n  \
kc watch                              # Every second until Ctrl-C\n  \
kc watch --interval 5 --count 12      # Every 5 seconds, 12 times\n  \
kc watch --format json                # One JSON document per line")]
    Watch {
        /// How often to collect (in seconds)
        #[arg(short = 'i', long, help = "Collection interval in seconds")]
        interval: Option<u64>,

        /// Stop after this many collection attempts
        #[arg(short = 'n', long, help = "Number of collections before exiting")]
        count: Option<u64>,

        /// Output format, overrides the configured one
        #[arg(short, long, value_enum, help = "Output format: text or json")]
        format: Option<OutputFormat>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_snapshot_json() {
        let cli = Cli::parse_from(["kc", "snapshot", "--format", "json"]);
        match cli.command {
            Commands::Snapshot { format } => assert_eq!(format, Some(OutputFormat::Json)),
            _ => panic!("expected snapshot"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_watch_with_global_config() {
        let cli = Cli::parse_from(["kc", "watch", "-i", "5", "-n", "3", "--config", "kc.toml"]);
        match cli.command {
            Commands::Watch {
                interval,
                count,
                format,
            } => {
                assert_eq!(interval, Some(5));
                assert_eq!(count, Some(3));
                assert_eq!(format, None);
            }
            _ => panic!("expected watch"),
        }
        assert_eq!(cli.config, Some(PathBuf::from("kc.toml")));
    }
}
