//! Per-session pipeline: runs the planned phases in order and publishes
//! progress through the session entry.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::{debug, error, info, warn};
use url::Url;

use super::OrchestratorSettings;
use super::phase::{self, Phase};
use super::session::SessionEntry;
use crate::catalog;
use crate::engine::{RequestCounter, ScanEngine, TestContext, injectable_parameters};
use crate::error::{Error, Result, ScanError};
use crate::models::{
    AiAnalysis, CertificateInfo, Finding, PhaseIssue, ScanResult, ScanSummary, ServerInfo,
    SummaryContext, TestCategory,
};

/// Everything gathered by the phases so far
#[derive(Default)]
struct Collected {
    server_info: Option<ServerInfo>,
    certificate_info: Option<CertificateInfo>,
    locations: Vec<String>,
    findings: Vec<Finding>,
    ai_analysis: Option<AiAnalysis>,
    recording: Option<String>,
    issues: Vec<PhaseIssue>,
}

impl Collected {
    fn issue(&mut self, phase: Phase, err: &Error) {
        warn!("{} phase failed: {}", phase, err);
        self.issues.push(PhaseIssue {
            phase: phase.name().to_string(),
            message: err.to_string(),
        });
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Await `fut`, turning an elapsed limit into a phase timeout and a panic
/// into that phase's failure
async fn bounded<T, F>(phase: Phase, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) => {
            let message = format!("panicked: {}", panic_message(payload.as_ref()));
            error!("{} phase {}", phase, message);
            Err(match phase {
                Phase::Test(kind) => ScanError::TestModuleFailure {
                    category: kind.label().to_string(),
                    message,
                },
                _ => ScanError::Failed(format!("{} {}", phase.name(), message)),
            }
            .into())
        }
        Err(_) => Err(ScanError::Timeout {
            phase: phase.name().to_string(),
            after: limit,
        }
        .into()),
    }
}

pub(crate) struct Pipeline {
    entry: Arc<SessionEntry>,
    engine: ScanEngine,
    settings: OrchestratorSettings,
    target: Url,
}

impl Pipeline {
    pub(crate) fn new(
        entry: Arc<SessionEntry>,
        engine: ScanEngine,
        settings: OrchestratorSettings,
        target: Url,
    ) -> Self {
        Self {
            entry,
            engine,
            settings,
            target,
        }
    }

    pub(crate) async fn run(self) {
        let id = self.entry.id;
        let config = self.entry.config.clone();
        let started = Utc::now();
        let ctx = TestContext {
            session_id: id.to_string(),
            mode: config.mode,
            seed: config.seed.unwrap_or_else(|| id.seed()),
            concurrency: config.threads,
            auth: config.auth.clone(),
            requests: RequestCounter::new(),
        };

        let phases = phase::plan(&config);
        let mut collected = Collected::default();

        for (index, phase) in phases.iter().copied().enumerate() {
            if self.entry.is_cancel_requested() {
                info!("Scan {} cancelled before {}", id, phase);
                self.entry.mark_cancelled();
                return;
            }

            debug!("Scan {} entering {}", id, phase);
            self.entry
                .enter_phase(phase::progress_at(&phases, index), &phase.message());

            if phase == Phase::Compile {
                let result = self.compile(std::mem::take(&mut collected), started, &ctx);
                info!(
                    "Scan {} completed with {} findings",
                    id, result.summary.total
                );
                self.entry.complete(result);
                return;
            }

            if let Err(e) = self.execute(phase, &mut collected, &ctx).await {
                info!("Scan {} failed in {}: {}", id, phase, e);
                self.entry.fail(e.to_string());
                return;
            }
        }
    }

    /// Run one phase. Only an error returned here ends the scan; every other
    /// failure is recorded as an issue.
    async fn execute(
        &self,
        phase: Phase,
        collected: &mut Collected,
        ctx: &TestContext,
    ) -> std::result::Result<(), ScanError> {
        let limits = &self.settings;
        let target = &self.target;

        match phase {
            Phase::Recon => {
                let reached =
                    bounded(phase, limits.recon_timeout, self.engine.recon.reach(target, ctx)).await;
                match reached {
                    Ok(()) => {}
                    Err(Error::Scan(e @ ScanError::TargetUnreachable(_))) => return Err(e),
                    Err(e) => return Err(ScanError::TargetUnreachable(e.to_string())),
                }
            }
            Phase::ServerInfo => {
                match bounded(
                    phase,
                    limits.recon_timeout,
                    self.engine.recon.server_info(target, ctx),
                )
                .await
                {
                    Ok(info) => collected.server_info = Some(info),
                    Err(e) => collected.issue(phase, &e),
                }
            }
            Phase::CertCheck => {
                match bounded(
                    phase,
                    limits.recon_timeout,
                    self.engine.recon.certificate(target, ctx),
                )
                .await
                {
                    Ok(info) => collected.certificate_info = info,
                    Err(e) => collected.issue(phase, &e),
                }
            }
            Phase::Discovery => {
                let depth = self.entry.config.crawl_depth;
                match bounded(
                    phase,
                    limits.discovery_timeout,
                    self.engine.discovery.discover(target, depth, ctx),
                )
                .await
                {
                    Ok(locations) => collected.locations = locations,
                    Err(e) => collected.issue(phase, &e),
                }
                if collected.locations.is_empty() {
                    collected.locations.push(target.to_string());
                }
            }
            Phase::Test(kind) => {
                match self.run_module(kind, &collected.locations, ctx).await {
                    Ok(findings) => {
                        debug!("{} contributed {} findings", phase, findings.len());
                        collected.findings.extend(findings);
                    }
                    Err(e) => collected.issue(phase, &e),
                }
            }
            Phase::AiAnalysis => {
                match bounded(
                    phase,
                    limits.analysis_timeout,
                    self.engine.analyst.analyze(target, &collected.findings),
                )
                .await
                {
                    Ok(analysis) => collected.ai_analysis = Some(analysis),
                    Err(e) => collected.issue(phase, &e),
                }
            }
            Phase::Screenshotting => self.capture(phase, collected, ctx).await,
            Phase::Compile => {}
        }
        Ok(())
    }

    async fn run_module(
        &self,
        kind: TestCategory,
        locations: &[String],
        ctx: &TestContext,
    ) -> Result<Vec<Finding>> {
        let module = self.engine.module(kind).ok_or_else(|| ScanError::TestModuleFailure {
            category: kind.label().to_string(),
            message: "no test module registered".to_string(),
        })?;
        let payloads = catalog::payloads(kind);

        bounded(
            Phase::Test(kind),
            self.settings.module_timeout,
            module.test(locations, &payloads, ctx),
        )
        .await
    }

    async fn capture(&self, phase: Phase, collected: &mut Collected, ctx: &TestContext) {
        let config = &self.entry.config;
        let limit = self.settings.capture_timeout;

        if config.screenshots {
            let capture = &self.engine.capture;
            let findings = &collected.findings;
            let outcome = bounded(phase, limit, async {
                let mut references = Vec::with_capacity(findings.len());
                for finding in findings {
                    references.push(capture.capture(finding, ctx).await);
                }
                Ok(references)
            })
            .await;

            match outcome {
                Ok(references) => {
                    let mut failures = Vec::new();
                    for (finding, reference) in collected.findings.iter_mut().zip(references) {
                        match reference {
                            Ok(reference) => finding.screenshot = Some(reference),
                            Err(e) => failures.push(e),
                        }
                    }
                    for e in failures {
                        collected.issue(phase, &e);
                    }
                }
                Err(e) => collected.issue(phase, &e),
            }
        }

        if config.record_video {
            match bounded(phase, limit, self.engine.capture.record(&self.target, ctx)).await {
                Ok(recording) => collected.recording = Some(recording),
                Err(e) => collected.issue(phase, &e),
            }
        }
    }

    fn compile(
        &self,
        collected: Collected,
        started: DateTime<Utc>,
        ctx: &TestContext,
    ) -> ScanResult {
        let mut seen = HashSet::new();
        let findings: Vec<Finding> = collected
            .findings
            .into_iter()
            .filter(|f| seen.insert(f.id.clone()))
            .collect();

        let parameters_tested = collected
            .locations
            .iter()
            .map(|l| injectable_parameters(l).len())
            .sum();

        let summary = ScanSummary::tally(
            &findings,
            SummaryContext {
                scan_id: self.entry.id.to_string(),
                mode: self.entry.config.mode,
                start_time: started,
                end_time: Utc::now(),
                locations_tested: collected.locations.len(),
                parameters_tested,
                requests_issued: ctx.requests.get(),
            },
        );

        ScanResult {
            summary,
            findings,
            tested_locations: collected.locations,
            config: (*self.entry.config).clone(),
            server_info: collected.server_info,
            certificate_info: collected.certificate_info,
            ai_analysis: collected.ai_analysis,
            recording: collected.recording,
            issues: collected.issues,
        }
    }
}
