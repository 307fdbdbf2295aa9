//! Scan engine: the external capabilities the orchestrator drives
//!
//! Each capability is a trait so the orchestrator can run against real HTTP
//! probing or against deterministic simulated fixtures without caring which.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::catalog;
use crate::config::HttpSettings;
use crate::error::Result;
use crate::models::{
    AiAnalysis, Category, CertificateInfo, Credentials, Finding, FindingStatus, ScanMode,
    ServerInfo, Severity, TestCategory, finding_id,
};

pub mod analysis;
pub mod capture;
pub mod discovery;
pub mod modules;
pub mod page;
pub mod parallel;
pub mod probe;
pub mod recon;
pub mod sampling;
pub mod simulated;

pub use analysis::HeuristicAnalyst;
pub use capture::SnapshotCapture;
pub use discovery::HttpDiscovery;
pub use probe::HttpProbe;
pub use recon::HttpRecon;
pub use simulated::SimulatedProfile;

/// Shared counter of network requests issued on behalf of one session
#[derive(Debug, Clone, Default)]
pub struct RequestCounter(Arc<AtomicU64>);

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-session context handed to every capability call
#[derive(Debug, Clone)]
pub struct TestContext {
    pub session_id: String,
    pub mode: ScanMode,
    pub seed: u64,
    /// Upper bound on concurrent probes inside one call
    pub concurrency: usize,
    pub auth: Option<Credentials>,
    pub requests: RequestCounter,
}

/// Reachability and fingerprinting of the target
#[async_trait]
pub trait Recon: Send + Sync {
    /// Confirm the target answers at all. Failure here is fatal to the scan.
    async fn reach(&self, target: &Url, ctx: &TestContext) -> Result<()>;

    async fn server_info(&self, target: &Url, ctx: &TestContext) -> Result<ServerInfo>;

    /// Transport security details; `None` for plain-HTTP targets
    async fn certificate(&self, target: &Url, ctx: &TestContext)
    -> Result<Option<CertificateInfo>>;
}

/// Enumerates candidate locations below the target
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, target: &Url, depth: u32, ctx: &TestContext) -> Result<Vec<String>>;
}

/// One vulnerability check category.
///
/// Returns an empty list when nothing is found; errors are reserved for
/// infrastructure problems such as no location being reachable.
#[async_trait]
pub trait TestModule: Send + Sync {
    fn kind(&self) -> TestCategory;

    async fn test(
        &self,
        locations: &[String],
        payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>>;
}

/// Produces a narrative summary and prioritized remediation
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, target: &Url, findings: &[Finding]) -> Result<AiAnalysis>;
}

/// Captures visual or response evidence for findings
#[async_trait]
pub trait Screenshotter: Send + Sync {
    /// Capture evidence for one finding, returning a reference to it
    async fn capture(&self, finding: &Finding, ctx: &TestContext) -> Result<String>;

    /// Record the whole session, returning a reference to the recording
    async fn record(&self, target: &Url, ctx: &TestContext) -> Result<String>;
}

/// The set of capabilities one orchestrator drives
#[derive(Clone)]
pub struct ScanEngine {
    pub recon: Arc<dyn Recon>,
    pub discovery: Arc<dyn Discovery>,
    modules: HashMap<TestCategory, Arc<dyn TestModule>>,
    pub analyst: Arc<dyn Analyst>,
    pub capture: Arc<dyn Screenshotter>,
}

impl ScanEngine {
    pub fn new(
        recon: Arc<dyn Recon>,
        discovery: Arc<dyn Discovery>,
        analyst: Arc<dyn Analyst>,
        capture: Arc<dyn Screenshotter>,
    ) -> Self {
        Self {
            recon,
            discovery,
            modules: HashMap::new(),
            analyst,
            capture,
        }
    }

    /// Register (or replace) the module for its category
    pub fn with_module(mut self, module: Arc<dyn TestModule>) -> Self {
        self.modules.insert(module.kind(), module);
        self
    }

    pub fn module(&self, kind: TestCategory) -> Option<Arc<dyn TestModule>> {
        self.modules.get(&kind).cloned()
    }

    /// Engine that probes real targets over HTTP
    pub fn http(settings: &HttpSettings, capture_dir: PathBuf) -> Result<Self> {
        let probe = Arc::new(HttpProbe::new(settings)?);

        let engine = Self::new(
            Arc::new(HttpRecon::new(probe.clone())),
            Arc::new(HttpDiscovery::new(probe.clone())),
            Arc::new(HeuristicAnalyst),
            Arc::new(SnapshotCapture::new(probe.clone(), capture_dir)),
        )
        .with_module(Arc::new(modules::XssModule::new(probe.clone())))
        .with_module(Arc::new(modules::SqliModule::new(probe.clone())))
        .with_module(Arc::new(modules::CsrfModule::new(probe.clone())))
        .with_module(Arc::new(modules::HeadersModule::new(probe.clone())))
        .with_module(Arc::new(modules::UploadModule::new(probe)));

        Ok(engine)
    }

    /// Engine backed by seeded synthetic fixtures
    pub fn simulated(profile: SimulatedProfile) -> Self {
        let profile = Arc::new(profile);
        let target = Arc::new(simulated::SimulatedTarget::new(profile.clone()));

        let mut engine = Self::new(
            target.clone(),
            target,
            Arc::new(HeuristicAnalyst),
            Arc::new(simulated::SimulatedCapture::new(profile.clone())),
        );
        for kind in TestCategory::ALL {
            engine = engine.with_module(Arc::new(simulated::SimulatedModule::new(
                kind,
                profile.clone(),
            )));
        }
        engine
    }
}

/// Builder for findings raised by test modules.
///
/// Fills description, remediation, CWE and CVSS from the catalog; the module
/// decides severity and evidence.
#[derive(Debug, Clone)]
pub struct Detection {
    category: Category,
    location: String,
    severity: Option<Severity>,
    title: Option<String>,
    parameter: Option<String>,
    payload: Option<String>,
    evidence: String,
}

impl Detection {
    pub fn new(category: Category, location: impl Into<String>) -> Self {
        Self {
            category,
            location: location.into(),
            severity: None,
            title: None,
            parameter: None,
            payload: None,
            evidence: String::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    pub fn into_finding(self) -> Finding {
        let entry = catalog::entry(self.category);
        let title = self.title.unwrap_or_else(|| entry.title.to_string());

        Finding {
            id: finding_id(
                self.category,
                &self.location,
                self.parameter.as_deref(),
                self.payload.as_deref(),
                &title,
            ),
            category: self.category,
            severity: self.severity.unwrap_or(entry.default_severity),
            title,
            location: self.location,
            parameter: self.parameter,
            payload: self.payload,
            description: entry.description.to_string(),
            evidence: self.evidence,
            remediation: entry.remediation.to_string(),
            cwe: entry.cwe_ids(),
            cvss: Some(entry.cvss),
            screenshot: None,
            discovered_at: Utc::now(),
            status: FindingStatus::Open,
        }
    }
}

/// Query parameter names of a location, or a default probe parameter
pub(crate) fn injectable_parameters(location: &str) -> Vec<String> {
    const DEFAULT_PARAM: &str = "q";

    let Ok(url) = Url::parse(location) else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    for (name, _) in url.query_pairs() {
        let name = name.into_owned();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        names.push(DEFAULT_PARAM.to_string());
    }
    names
}

/// Replace (or add) one query parameter with a payload
pub(crate) fn inject(location: &str, parameter: &str, payload: &str) -> Option<Url> {
    let mut url = Url::parse(location).ok()?;
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(k, _)| k == parameter) {
        Some(pair) => pair.1 = payload.to_string(),
        None => pairs.push((parameter.to_string(), payload.to_string())),
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Some(url)
}

/// Short window of `body` around the first occurrence of `needle`
pub(crate) fn excerpt(body: &str, needle: &str, radius: usize) -> String {
    let Some(pos) = body.find(needle) else {
        return String::new();
    };

    let mut start = pos.saturating_sub(radius);
    while !body.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (pos + needle.len() + radius).min(body.len());
    while !body.is_char_boundary(end) {
        end += 1;
    }

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(body[start..end].trim());
    if end < body.len() {
        out.push_str("...");
    }
    out
}
