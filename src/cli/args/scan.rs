//! Arguments for `vulnscope scan`

use std::path::PathBuf;

use clap::Args;

use crate::config::ScanDefaults;
use crate::models::{Credentials, ScanConfig, ScanMode, TestCategory, TestToggles};
use crate::report::ReportFormat;

/// Scan target and options.
///
/// Options left unset fall back to the `defaults` section of the config file.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Target URL (http or https)
    pub target: String,

    /// Scan intensity
    #[arg(long, short = 'm', value_enum)]
    pub mode: Option<ScanMode>,

    /// Test categories to run, comma separated (default: all)
    #[arg(long, short = 't', value_enum, value_delimiter = ',')]
    pub tests: Vec<TestCategory>,

    /// Crawl depth (1-10)
    #[arg(long)]
    pub depth: Option<u32>,

    /// Concurrent requests per test module (1-64)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Username for authenticated scanning
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// Password for authenticated scanning
    #[arg(long, env = "VULNSCOPE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Capture the locations of findings
    #[arg(long)]
    pub screenshots: bool,

    /// Record the scan session
    #[arg(long)]
    pub video: bool,

    /// Add an analysis summary with remediation steps
    #[arg(long)]
    pub ai: bool,

    /// Fixed seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run against the built-in simulated target instead of the network
    #[arg(long)]
    pub simulate: bool,

    /// Reports to write when the scan completes, comma separated
    #[arg(long, value_enum, value_delimiter = ',')]
    pub report: Vec<ReportFormat>,

    /// Directory for reports and captures
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Do not store the result in the local archive
    #[arg(long)]
    pub no_archive: bool,
}

impl ScanArgs {
    /// Build the scan config, filling unset options from `defaults`
    pub fn to_scan_config(&self, defaults: &ScanDefaults) -> ScanConfig {
        let tests = if self.tests.is_empty() {
            TestToggles::all()
        } else {
            TestToggles::only(&self.tests)
        };

        let auth = self.user.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        });

        ScanConfig {
            mode: self.mode.unwrap_or(defaults.mode),
            tests,
            crawl_depth: self.depth.unwrap_or(defaults.crawl_depth),
            threads: self.threads.unwrap_or(defaults.threads),
            auth,
            screenshots: self.screenshots,
            record_video: self.video,
            ai_analysis: self.ai,
            seed: self.seed,
            ..ScanConfig::new(self.target.trim())
        }
    }
}
