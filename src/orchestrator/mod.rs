//! Scan orchestrator: owns the session store and drives one pipeline task
//! per session.
//!
//! `start` validates the config, registers a pending session and spawns its
//! pipeline onto the current tokio runtime. Callers poll `status` (or
//! `subscribe` to the watch channel) until the session is terminal, then
//! fetch the result.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::watch;

use crate::config::Config;
use crate::engine::ScanEngine;
use crate::error::{Result, ScanError};
use crate::models::{ScanConfig, ScanResult};

mod phase;
mod pipeline;
mod session;

pub use session::{
    RetentionPolicy, SessionEntry, SessionId, SessionState, SessionStatus, SessionStore,
};

use pipeline::Pipeline;

/// Time limits and retention applied to every session
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub recon_timeout: Duration,
    pub discovery_timeout: Duration,
    pub module_timeout: Duration,
    pub analysis_timeout: Duration,
    pub capture_timeout: Duration,
    pub retention: RetentionPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let t = &config.timeouts;
        Self {
            recon_timeout: Duration::from_secs(t.recon_secs),
            discovery_timeout: Duration::from_secs(t.discovery_secs),
            module_timeout: Duration::from_secs(t.module_secs),
            analysis_timeout: Duration::from_secs(t.analysis_secs),
            capture_timeout: Duration::from_secs(t.capture_secs),
            retention: RetentionPolicy {
                ttl: config.session_ttl(),
                max_sessions: config.retention.max_sessions,
            },
        }
    }

    /// Same limit for every phase class
    pub fn with_phase_timeout(mut self, limit: Duration) -> Self {
        self.recon_timeout = limit;
        self.discovery_timeout = limit;
        self.module_timeout = limit;
        self.analysis_timeout = limit;
        self.capture_timeout = limit;
        self
    }
}

/// Entry point for running scans
pub struct Orchestrator {
    store: Arc<SessionStore>,
    engine: ScanEngine,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(engine: ScanEngine, settings: OrchestratorSettings) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            engine,
            settings,
        }
    }

    /// Validate `config` and launch a session for it.
    ///
    /// Returns as soon as the session is registered; it is visible to
    /// `status` immediately, in `pending` until its pipeline starts. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, config: ScanConfig) -> Result<SessionId> {
        let target = config.validate()?;
        self.evict_expired();

        let id = SessionId::new();
        let entry = Arc::new(SessionEntry::new(id, config));
        self.store.insert(entry.clone());

        info!("Scan {} started for {}", id, target);
        let pipeline = Pipeline::new(
            entry.clone(),
            self.engine.clone(),
            self.settings.clone(),
            target,
        );
        let task = tokio::spawn(pipeline.run());
        tokio::spawn(async move {
            match task.await {
                Err(e) if e.is_panic() => {
                    let message = pipeline::panic_message(e.into_panic().as_ref());
                    error!("Scan {} pipeline panicked: {}", entry.id, message);
                    entry.fail(format!("Scan pipeline panicked: {}", message));
                }
                _ => {}
            }
        });

        Ok(id)
    }

    /// Current snapshot of a session
    pub fn status(&self, id: &SessionId) -> Result<SessionStatus> {
        Ok(self.entry(id)?.snapshot())
    }

    /// Watch channel carrying every published snapshot of a session
    pub fn subscribe(&self, id: &SessionId) -> Result<watch::Receiver<SessionStatus>> {
        Ok(self.entry(id)?.subscribe())
    }

    /// Ask a session to stop at its next phase boundary.
    ///
    /// Returns false when the session is unknown or already finished.
    pub fn cancel(&self, id: &SessionId) -> bool {
        match self.store.get(id) {
            Some(entry) => {
                let accepted = entry.request_cancel();
                debug!("Cancel requested for {} (accepted: {})", id, accepted);
                accepted
            }
            None => false,
        }
    }

    /// Result of a completed session; the same shared value on every call
    pub fn result(&self, id: &SessionId) -> Result<Arc<ScanResult>> {
        let status = self.status(id)?;
        match (status.state, status.result) {
            (SessionState::Completed, Some(result)) => Ok(result),
            (state, _) => Err(ScanError::NotCompleted {
                id: id.to_string(),
                state: state.to_string(),
            }
            .into()),
        }
    }

    /// Wait until a session reaches a terminal state
    pub async fn wait(&self, id: &SessionId) -> Result<SessionStatus> {
        let mut rx = self.subscribe(id)?;
        let status = rx
            .wait_for(|status| status.state.is_terminal())
            .await
            .map_err(|_| ScanError::NotFound(id.to_string()))?
            .clone();
        Ok(status)
    }

    /// Apply the retention policy now; returns how many sessions were dropped
    pub fn evict_expired(&self) -> usize {
        self.store.evict(self.settings.retention)
    }

    /// Snapshots of every retained session, oldest first
    pub fn sessions(&self) -> Vec<SessionStatus> {
        self.store.entries().iter().map(|e| e.snapshot()).collect()
    }

    fn entry(&self, id: &SessionId) -> Result<Arc<SessionEntry>> {
        self.store
            .get(id)
            .ok_or_else(|| ScanError::NotFound(id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedProfile;
    use crate::error::Error;
    use crate::models::{Category, ScanMode, TestCategory, TestToggles};

    fn orchestrator(profile: SimulatedProfile) -> Orchestrator {
        Orchestrator::new(
            ScanEngine::simulated(profile),
            OrchestratorSettings::default(),
        )
    }

    fn config(url: &str) -> ScanConfig {
        let mut config = ScanConfig::new(url);
        config.seed = Some(11);
        config
    }

    #[tokio::test]
    async fn test_xss_only_scan_has_only_xss_findings() {
        let orch = orchestrator(SimulatedProfile::default().with_hit_rate(1.0));
        let mut config = config("https://example.com");
        config.mode = ScanMode::Quick;
        config.tests = TestToggles::only(&[TestCategory::Xss]);

        let id = orch.start(config).unwrap();
        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Completed);
        assert_eq!(status.progress, 100);

        let result = orch.result(&id).unwrap();
        assert!(!result.findings.is_empty());
        assert!(result.findings.iter().all(|f| f.category == Category::Xss));
        assert!(result.summary.is_consistent());
        assert_eq!(result.summary.total, result.findings.len());
        assert!(result.summary.end_time >= result.summary.start_time);
    }

    #[tokio::test]
    async fn test_invalid_config_creates_no_session() {
        let orch = orchestrator(SimulatedProfile::default());

        let err = orch.start(config("not-a-url")).unwrap_err();
        assert!(matches!(err, Error::Scan(ScanError::InvalidConfig(_))));
        assert!(orch.sessions().is_empty());

        let fabricated = SessionId::new();
        assert!(matches!(
            orch.status(&fabricated),
            Err(Error::Scan(ScanError::NotFound(_)))
        ));
        assert!(!orch.cancel(&fabricated));
    }

    #[tokio::test]
    async fn test_status_visible_immediately_as_pending() {
        let orch = orchestrator(SimulatedProfile::default());
        let id = orch.start(config("https://example.com")).unwrap();

        // The current-thread runtime has not polled the pipeline yet
        let status = orch.status(&id).unwrap();
        assert_eq!(status.state, SessionState::Pending);
        assert!(matches!(
            orch.result(&id),
            Err(Error::Scan(ScanError::NotCompleted { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cancel_immediately_after_start() {
        let orch = orchestrator(SimulatedProfile::default().with_hit_rate(1.0));
        let id = orch.start(config("https://example.com")).unwrap();

        assert!(orch.cancel(&id));
        let status = orch.wait(&id).await.unwrap();

        assert_eq!(status.state, SessionState::Cancelled);
        assert!(status.result.is_none());
        assert!(matches!(
            orch.result(&id),
            Err(Error::Scan(ScanError::NotCompleted { .. }))
        ));
        assert!(!orch.cancel(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_scan_stops_at_phase_boundary() {
        let profile = SimulatedProfile::default().with_latency(Duration::from_millis(100));
        let orch = orchestrator(profile);
        let id = orch.start(config("https://example.com")).unwrap();

        let mut rx = orch.subscribe(&id).unwrap();
        rx.wait_for(|s| s.phase_message.as_deref() == Some("Discovering pages and parameters"))
            .await
            .unwrap();
        assert!(orch.cancel(&id));

        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Cancelled);
        assert!(status.progress < 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic() {
        let profile = SimulatedProfile::default().with_latency(Duration::from_millis(50));
        let orch = orchestrator(profile);
        let mut config = config("https://example.com");
        config.ai_analysis = true;
        config.screenshots = true;
        let id = orch.start(config).unwrap();

        let mut observed = Vec::new();
        loop {
            let status = orch.status(&id).unwrap();
            observed.push(status.progress);
            if status.state.is_terminal() {
                assert_eq!(status.state, SessionState::Completed);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*observed.last().unwrap(), 100);
        assert!(observed.iter().any(|p| *p > 0 && *p < 100));
    }

    #[tokio::test]
    async fn test_result_is_idempotent() {
        let orch = orchestrator(SimulatedProfile::default().with_hit_rate(0.5));
        let id = orch.start(config("https://example.com")).unwrap();
        orch.wait(&id).await.unwrap();

        let first = serde_json::to_vec(orch.result(&id).unwrap().as_ref()).unwrap();
        let second = serde_json::to_vec(orch.result(&id).unwrap().as_ref()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_without_result() {
        let orch = orchestrator(SimulatedProfile::default().unreachable());
        let id = orch.start(config("https://example.com")).unwrap();

        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Failed);
        assert!(status.error.unwrap().contains("Target unreachable"));
        assert!(status.result.is_none());
        assert!(orch.result(&id).is_err());
    }

    #[tokio::test]
    async fn test_failing_module_is_not_fatal() {
        let profile = SimulatedProfile::default()
            .with_hit_rate(1.0)
            .failing(TestCategory::Sqli);
        let orch = orchestrator(profile);
        let id = orch.start(config("https://example.com")).unwrap();

        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Completed);

        let result = orch.result(&id).unwrap();
        assert!(
            result
                .findings
                .iter()
                .all(|f| f.category != Category::SqlInjection)
        );
        assert!(result.findings.iter().any(|f| f.category == Category::Xss));
        assert!(result.issues.iter().any(|i| i.phase == "sql"));
    }

    #[tokio::test]
    async fn test_failed_discovery_falls_back_to_target() {
        let orch = orchestrator(SimulatedProfile::default().failing_discovery());
        let id = orch.start(config("https://example.com/app")).unwrap();
        orch.wait(&id).await.unwrap();

        let result = orch.result(&id).unwrap();
        assert_eq!(result.tested_locations, vec!["https://example.com/app".to_string()]);
        assert!(result.issues.iter().any(|i| i.phase == "discovery"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recon_timeout_is_fatal() {
        let profile = SimulatedProfile::default().with_latency(Duration::from_secs(5));
        let orch = Orchestrator::new(
            ScanEngine::simulated(profile),
            OrchestratorSettings::default().with_phase_timeout(Duration::from_secs(1)),
        );
        let id = orch.start(config("https://example.com")).unwrap();

        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Failed);
        let error = status.error.unwrap();
        assert!(error.contains("Target unreachable"));
        assert!(error.contains("recon timed out"));
    }

    #[tokio::test]
    async fn test_optional_phases_populate_result() {
        let orch = orchestrator(SimulatedProfile::default().with_hit_rate(1.0));
        let mut config = config("https://example.com");
        config.ai_analysis = true;
        config.screenshots = true;
        config.record_video = true;
        let id = orch.start(config).unwrap();
        orch.wait(&id).await.unwrap();

        let result = orch.result(&id).unwrap();
        assert!(result.ai_analysis.is_some());
        assert!(result.recording.is_some());
        assert!(result.findings.iter().all(|f| f.screenshot.is_some()));
        assert!(result.server_info.is_some());
        assert!(result.certificate_info.is_some());
        assert!(result.summary.requests_issued > 0);
    }

    #[tokio::test]
    async fn test_capture_failure_recorded() {
        let profile = SimulatedProfile::default()
            .with_hit_rate(1.0)
            .failing_capture();
        let orch = orchestrator(profile);
        let mut config = config("https://example.com");
        config.screenshots = true;
        let id = orch.start(config).unwrap();

        let status = orch.wait(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Completed);
        let result = orch.result(&id).unwrap();
        assert!(result.issues.iter().any(|i| i.phase == "screenshotting"));
        assert!(!result.has_screenshots());
    }

    #[tokio::test]
    async fn test_same_seed_same_findings() {
        let orch = orchestrator(SimulatedProfile::default().with_hit_rate(0.5));
        let a = orch.start(config("https://example.com")).unwrap();
        let b = orch.start(config("https://example.com")).unwrap();
        orch.wait(&a).await.unwrap();
        orch.wait(&b).await.unwrap();

        let ids = |id: &SessionId| -> Vec<String> {
            orch.result(id)
                .unwrap()
                .findings
                .iter()
                .map(|f| f.id.clone())
                .collect()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[tokio::test]
    async fn test_sessions_run_independently() {
        let orch = orchestrator(SimulatedProfile::default());
        let ok = orch.start(config("https://example.com")).unwrap();
        let cancelled = orch.start(config("https://example.org")).unwrap();
        orch.cancel(&cancelled);

        assert_eq!(orch.wait(&ok).await.unwrap().state, SessionState::Completed);
        assert_eq!(
            orch.wait(&cancelled).await.unwrap().state,
            SessionState::Cancelled
        );
        assert_eq!(orch.sessions().len(), 2);
    }

    struct PanickingModule;

    #[async_trait::async_trait]
    impl crate::engine::TestModule for PanickingModule {
        fn kind(&self) -> TestCategory {
            TestCategory::Xss
        }

        async fn test(
            &self,
            _: &[String],
            _: &[String],
            _: &crate::engine::TestContext,
        ) -> Result<Vec<crate::models::Finding>> {
            panic!("payload table exhausted")
        }
    }

    struct PanickingAnalyst;

    #[async_trait::async_trait]
    impl crate::engine::Analyst for PanickingAnalyst {
        async fn analyze(
            &self,
            _: &url::Url,
            _: &[crate::models::Finding],
        ) -> Result<crate::models::AiAnalysis> {
            panic!("analyst crashed")
        }
    }

    async fn finish(orch: &Orchestrator, id: &SessionId) -> SessionStatus {
        tokio::time::timeout(Duration::from_secs(5), orch.wait(id))
            .await
            .expect("session never reached a terminal state")
            .unwrap()
    }

    #[tokio::test]
    async fn test_panicking_module_is_not_fatal() {
        let engine = ScanEngine::simulated(SimulatedProfile::default().with_hit_rate(1.0))
            .with_module(Arc::new(PanickingModule));
        let orch = Orchestrator::new(engine, OrchestratorSettings::default());

        let id = orch.start(config("https://example.com")).unwrap();
        let status = finish(&orch, &id).await;
        assert_eq!(status.state, SessionState::Completed);

        let result = orch.result(&id).unwrap();
        assert!(result.findings.iter().all(|f| f.category != Category::Xss));
        assert!(result.findings.iter().any(|f| f.category == Category::SqlInjection));
        let issue = result
            .issues
            .iter()
            .find(|i| i.phase == "xss")
            .expect("xss issue recorded");
        assert!(issue.message.contains("payload table exhausted"));
        assert!(result.summary.is_consistent());
    }

    #[tokio::test]
    async fn test_panicking_analyst_is_not_fatal() {
        let mut engine = ScanEngine::simulated(SimulatedProfile::default());
        engine.analyst = Arc::new(PanickingAnalyst);
        let orch = Orchestrator::new(engine, OrchestratorSettings::default());

        let mut config = config("https://example.com");
        config.ai_analysis = true;
        let id = orch.start(config).unwrap();
        let status = finish(&orch, &id).await;

        assert_eq!(status.state, SessionState::Completed);
        let result = orch.result(&id).unwrap();
        assert!(result.ai_analysis.is_none());
        assert!(result.issues.iter().any(|i| i.phase == "aiAnalysis"));
    }
}
