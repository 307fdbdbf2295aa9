//! Pipeline phases and the progress they account for

use std::fmt;

use crate::models::{ScanConfig, TestCategory};

/// One ordered stage of the scan pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Recon,
    ServerInfo,
    CertCheck,
    Discovery,
    Test(TestCategory),
    AiAnalysis,
    Screenshotting,
    Compile,
}

impl Phase {
    /// Share of total progress this phase accounts for
    pub fn weight(&self) -> u32 {
        match self {
            Phase::Recon => 5,
            Phase::ServerInfo => 3,
            Phase::CertCheck => 3,
            Phase::Discovery => 12,
            Phase::Test(_) => 14,
            Phase::AiAnalysis => 8,
            Phase::Screenshotting => 8,
            Phase::Compile => 5,
        }
    }

    /// Short name used in logs and recorded issues
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Recon => "recon",
            Phase::ServerInfo => "serverInfo",
            Phase::CertCheck => "certCheck",
            Phase::Discovery => "discovery",
            Phase::Test(TestCategory::Xss) => "xss",
            Phase::Test(TestCategory::Sqli) => "sql",
            Phase::Test(TestCategory::Csrf) => "csrf",
            Phase::Test(TestCategory::Headers) => "headers",
            Phase::Test(TestCategory::Upload) => "fileUpload",
            Phase::AiAnalysis => "aiAnalysis",
            Phase::Screenshotting => "screenshotting",
            Phase::Compile => "compile",
        }
    }

    /// Human-readable description shown while the phase runs
    pub fn message(&self) -> String {
        match self {
            Phase::Recon => "Checking target reachability".to_string(),
            Phase::ServerInfo => "Fingerprinting server".to_string(),
            Phase::CertCheck => "Inspecting transport security".to_string(),
            Phase::Discovery => "Discovering pages and parameters".to_string(),
            Phase::Test(kind) => format!("Running {} tests", kind.label()),
            Phase::AiAnalysis => "Analyzing findings".to_string(),
            Phase::Screenshotting => "Capturing evidence".to_string(),
            Phase::Compile => "Compiling results".to_string(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phases a config runs, in pipeline order. Disabled phases are left out
/// without reordering the rest.
pub fn plan(config: &ScanConfig) -> Vec<Phase> {
    let mut phases = vec![
        Phase::Recon,
        Phase::ServerInfo,
        Phase::CertCheck,
        Phase::Discovery,
    ];
    phases.extend(config.tests.enabled().into_iter().map(Phase::Test));
    if config.ai_analysis {
        phases.push(Phase::AiAnalysis);
    }
    if config.screenshots || config.record_video {
        phases.push(Phase::Screenshotting);
    }
    phases.push(Phase::Compile);
    phases
}

/// Progress when phase `index` of `plan` starts, capped below 100
pub fn progress_at(plan: &[Phase], index: usize) -> u8 {
    let total: u32 = plan.iter().map(Phase::weight).sum();
    if total == 0 {
        return 0;
    }
    let done: u32 = plan.iter().take(index).map(Phase::weight).sum();
    ((done * 100 / total).min(99)) as u8
}
