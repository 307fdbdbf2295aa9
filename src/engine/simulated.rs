//! Simulated engine backed by static catalog tables.
//!
//! Produces plausible findings without touching the network. Every choice is
//! drawn from a generator seeded by the session seed, so a fixed seed gives a
//! fixed result. Profiles can inject latency and failures for exercising the
//! orchestrator's error paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use url::Url;

use super::{
    Detection, Discovery, Recon, Screenshotter, TestContext, TestModule, injectable_parameters,
    sampling,
};
use crate::catalog::{self, REQUIRED_HEADERS, SIMULATED_PAGES};
use crate::error::{Error, Result, ScanError};
use crate::models::{CertificateInfo, Finding, ServerInfo, TestCategory};

/// Behaviour knobs for the simulated engine
#[derive(Debug, Clone)]
pub struct SimulatedProfile {
    /// Delay added to every call
    pub latency: Duration,
    /// Chance that a sampled location yields a finding
    pub hit_rate: f64,
    pub unreachable: bool,
    pub failing_discovery: bool,
    pub failing_capture: bool,
    pub failing: Vec<TestCategory>,
}

impl Default for SimulatedProfile {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            hit_rate: 0.35,
            unreachable: false,
            failing_discovery: false,
            failing_capture: false,
            failing: Vec::new(),
        }
    }
}

impl SimulatedProfile {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_hit_rate(mut self, hit_rate: f64) -> Self {
        self.hit_rate = hit_rate.clamp(0.0, 1.0);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.failing_discovery = true;
        self
    }

    pub fn failing_capture(mut self) -> Self {
        self.failing_capture = true;
        self
    }

    pub fn failing(mut self, kind: TestCategory) -> Self {
        self.failing.push(kind);
        self
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Recon and discovery over the simulated site map
pub struct SimulatedTarget {
    profile: Arc<SimulatedProfile>,
}

impl SimulatedTarget {
    pub fn new(profile: Arc<SimulatedProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Recon for SimulatedTarget {
    async fn reach(&self, target: &Url, ctx: &TestContext) -> Result<()> {
        self.profile.pause().await;
        ctx.requests.add(1);
        if self.profile.unreachable {
            return Err(
                ScanError::TargetUnreachable(format!("{}: connection refused", target)).into(),
            );
        }
        Ok(())
    }

    async fn server_info(&self, _target: &Url, ctx: &TestContext) -> Result<ServerInfo> {
        self.profile.pause().await;
        ctx.requests.add(1);
        Ok(ServerInfo {
            status_code: 200,
            server: Some("nginx/1.24.0".to_string()),
            powered_by: Some("PHP/8.2.7".to_string()),
            content_type: Some("text/html; charset=UTF-8".to_string()),
            response_time_ms: 40 + ctx.seed % 160,
        })
    }

    async fn certificate(
        &self,
        target: &Url,
        _ctx: &TestContext,
    ) -> Result<Option<CertificateInfo>> {
        self.profile.pause().await;
        if target.scheme() != "https" {
            return Ok(None);
        }
        Ok(Some(CertificateInfo {
            https: true,
            verified: true,
            hsts: None,
            issuer: Some("Simulated Issuing CA".to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::days(90)),
        }))
    }
}

#[async_trait]
impl Discovery for SimulatedTarget {
    async fn discover(&self, target: &Url, depth: u32, ctx: &TestContext) -> Result<Vec<String>> {
        self.profile.pause().await;
        if self.profile.failing_discovery {
            return Err(ScanError::Network("crawler lost connection".to_string()).into());
        }

        // Four more pages become visible per level of depth
        let visible = (depth as usize * 4).min(SIMULATED_PAGES.len());
        let mut locations = vec![target.to_string()];
        for path in &SIMULATED_PAGES[..visible] {
            if let Ok(url) = target.join(path) {
                locations.push(url.to_string());
            }
        }
        ctx.requests.add(locations.len() as u64);
        Ok(locations)
    }
}

/// One simulated test category
pub struct SimulatedModule {
    kind: TestCategory,
    profile: Arc<SimulatedProfile>,
}

impl SimulatedModule {
    pub fn new(kind: TestCategory, profile: Arc<SimulatedProfile>) -> Self {
        Self { kind, profile }
    }

    fn detect<R: Rng>(&self, location: &str, payloads: &[String], rng: &mut R) -> Finding {
        let category = self.kind.finding_category();
        let patterns = catalog::evidence_patterns(category);
        let pattern = patterns[rng.gen_range(0..patterns.len())];

        let (location, parameter, payload, severity) = match self.kind {
            TestCategory::Xss | TestCategory::Sqli => {
                let params = injectable_parameters(location);
                let parameter = params.first().cloned();
                let payload = if payloads.is_empty() {
                    None
                } else {
                    Some(payloads[rng.gen_range(0..payloads.len())].clone())
                };
                let severity = catalog::entry(category).default_severity;
                (location.to_string(), parameter, payload, severity)
            }
            TestCategory::Headers => {
                let header = REQUIRED_HEADERS[rng.gen_range(0..REQUIRED_HEADERS.len())];
                let root = Url::parse(location)
                    .and_then(|u| u.join("/"))
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| location.to_string());
                (root, Some(header.name.to_string()), None, header.severity)
            }
            TestCategory::Csrf | TestCategory::Upload => {
                let severity = catalog::entry(category).default_severity;
                (location.to_string(), None, None, severity)
            }
        };

        let evidence = pattern
            .replace("{payload}", payload.as_deref().unwrap_or(""))
            .replace("{param}", parameter.as_deref().unwrap_or(""));

        let mut detection = Detection::new(category, location)
            .severity(severity)
            .evidence(evidence);
        if let Some(parameter) = parameter {
            detection = detection.parameter(parameter);
        }
        if let Some(payload) = payload {
            detection = detection.payload(payload);
        }
        detection.into_finding()
    }
}

#[async_trait]
impl TestModule for SimulatedModule {
    fn kind(&self) -> TestCategory {
        self.kind
    }

    async fn test(
        &self,
        locations: &[String],
        payloads: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        self.profile.pause().await;
        if self.profile.failing.contains(&self.kind) {
            return Err(ScanError::TestModuleFailure {
                category: self.kind.label().to_string(),
                message: "simulated module failure".to_string(),
            }
            .into());
        }

        let (locations, payloads) =
            sampling::sample(locations, payloads, ctx.mode, ctx.seed, self.kind);
        ctx.requests
            .add((locations.len() * payloads.len().max(1)) as u64);

        let mut rng = sampling::rng_for(ctx.seed.rotate_left(17), self.kind);
        let mut findings: Vec<Finding> = Vec::new();
        for location in &locations {
            if !rng.gen_bool(self.profile.hit_rate) {
                continue;
            }
            let finding = self.detect(location, &payloads, &mut rng);
            if !findings.iter().any(|f| f.id == finding.id) {
                findings.push(finding);
            }
        }
        Ok(findings)
    }
}

/// Capture that hands out synthetic evidence references
pub struct SimulatedCapture {
    profile: Arc<SimulatedProfile>,
}

impl SimulatedCapture {
    pub fn new(profile: Arc<SimulatedProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Screenshotter for SimulatedCapture {
    async fn capture(&self, finding: &Finding, ctx: &TestContext) -> Result<String> {
        self.profile.pause().await;
        if self.profile.failing_capture {
            return Err(Error::Other("screenshot browser crashed".to_string()));
        }
        Ok(format!(
            "simulated://screenshots/{}/{}.png",
            ctx.session_id, finding.id
        ))
    }

    async fn record(&self, _target: &Url, ctx: &TestContext) -> Result<String> {
        self.profile.pause().await;
        if self.profile.failing_capture {
            return Err(Error::Other("screen recorder crashed".to_string()));
        }
        Ok(format!("simulated://recordings/{}.webm", ctx.session_id))
    }
}
