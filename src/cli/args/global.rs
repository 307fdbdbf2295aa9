//! Global CLI options shared across all commands

use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to command handlers.
///
/// Captures the flag/env layer. Config file values are resolved later in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.vulnscope/config.yaml)
    pub config: Option<PathBuf>,

    /// Custom archive directory (defaults to the user cache directory)
    pub archive_dir: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            archive_dir: cli.archive_dir.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn archive_dir_ref(&self) -> Option<&Path> {
        self.archive_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli() {
        let cli = Cli::try_parse_from([
            "vulnscope",
            "--config",
            "/custom/config.yaml",
            "--debug",
            "catalog",
        ])
        .unwrap();
        let opts = GlobalOptions::from_cli(&cli);

        assert_eq!(opts.config_ref(), Some(Path::new("/custom/config.yaml")));
        assert_eq!(opts.archive_dir_ref(), None);
    }

    #[test]
    fn test_none_accessors() {
        let opts = GlobalOptions {
            format: OutputFormat::Pretty,
            config: None,
            archive_dir: None,
        };

        assert_eq!(opts.config_ref(), None);
        assert_eq!(opts.archive_dir_ref(), None);
    }
}
