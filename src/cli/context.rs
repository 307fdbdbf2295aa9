//! Command execution context
//!
//! Loads the configuration once and resolves the directories handlers write
//! to, so individual commands only deal with their own arguments.

use std::path::{Path, PathBuf};

use crate::archive::ArchiveStorage;
use crate::cli::{GlobalOptions, OutputFormat};
use crate::config::Config;
use crate::error::Result;

/// Context for command execution containing config and runtime options
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
    archive_dir: Option<PathBuf>,
}

impl CommandContext {
    /// Load the config named by the options (or the default one).
    ///
    /// # Errors
    /// Returns an error if an explicitly named config file is missing or
    /// either file fails to parse or validate.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        Ok(Self {
            config,
            format: opts.format,
            archive_dir: opts.archive_dir_ref().map(Path::to_path_buf),
        })
    }

    /// Open the result archive
    pub fn archive(&self) -> Result<ArchiveStorage> {
        Ok(ArchiveStorage::open(self.archive_dir.as_deref())?)
    }

    /// Directory holding the archive database and captures
    pub fn archive_dir(&self) -> Result<PathBuf> {
        match &self.archive_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(ArchiveStorage::default_dir()?),
        }
    }

    /// Where reports go: the flag, then the config file, then the working directory
    pub fn report_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.config.report.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn report_title(&self) -> Option<&str> {
        self.config.report.title.as_deref()
    }
}
