//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod archive;
pub mod args;
pub mod catalog;
pub mod config;
pub mod context;
pub mod history;
pub mod report;
pub mod scan;

pub use args::{GlobalOptions, OutputFormat, ScanArgs};
pub use context::CommandContext;

use crate::archive::LATEST;
use crate::report::ReportFormat;

/// vulnscope - web vulnerability scan orchestration and reporting
#[derive(Parser, Debug)]
#[command(name = "vulnscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "VULNSCOPE_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "VULNSCOPE_CONFIG", hide_env = true)]
    pub config: Option<PathBuf>,

    /// Override result archive directory
    #[arg(long, global = true, env = "VULNSCOPE_ARCHIVE_DIR", hide_env = true)]
    pub archive_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "VULNSCOPE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a web application
    Scan(ScanArgs),

    /// Write a report for an archived scan
    Report {
        /// Scan ID, unique ID prefix, or "latest"
        #[arg(default_value = LATEST)]
        scan: String,

        /// Report type
        #[arg(long = "type", short = 't', value_enum, default_value = "html")]
        report_type: ReportFormat,

        /// Output file (defaults to a generated name in the report directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Browse archived scans
    #[command(subcommand)]
    History(HistoryCommands),

    /// List the finding catalog
    Catalog,

    /// Manage the local result archive
    #[command(subcommand)]
    Archive(ArchiveCommands),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   vulnscope completion bash > /etc/bash_completion.d/vulnscope
  zsh:    vulnscope completion zsh > \"${fpath[1]}/_vulnscope\"
  fish:   vulnscope completion fish > ~/.config/fish/completions/vulnscope.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Archived scan subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recently archived scans, newest first
    List {
        /// Maximum number of scans to show
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Show the summary and findings of an archived scan
    Show {
        /// Scan ID, unique ID prefix, or "latest"
        #[arg(default_value = LATEST)]
        scan: String,
    },
}

/// Result archive subcommands
#[derive(Subcommand, Debug)]
pub enum ArchiveCommands {
    /// Show archive statistics
    Status,

    /// Remove every archived scan
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Print the archive directory
    Path,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file location
    Path,
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
    fn test_report_defaults() {
        let cli = Cli::try_parse_from(["vulnscope", "report"]).unwrap();
        match cli.command {
            Commands::Report {
                scan,
                report_type,
                output,
            } => {
                assert_eq!(scan, "latest");
                assert_eq!(report_type, ReportFormat::Html);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vulnscope",
            "history",
            "list",
            "--format",
            "json",
            "--archive-dir",
            "/tmp/vs",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.archive_dir, Some(PathBuf::from("/tmp/vs")));
        assert!(matches!(
            cli.command,
            Commands::History(HistoryCommands::List { limit: 20 })
        ));
    }

    #[test]
    fn test_archive_clear_yes() {
        let cli = Cli::try_parse_from(["vulnscope", "archive", "clear", "-y"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Archive(ArchiveCommands::Clear { yes: true })
        ));
    }
}
