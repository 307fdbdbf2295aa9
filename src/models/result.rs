//! Scan result aggregate and derived summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::finding::{Finding, Severity};
use super::scan::{ScanConfig, ScanMode};

/// Severity counts and scan bookkeeping, always derived from the findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub scan_id: String,
    pub mode: ScanMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub locations_tested: usize,
    pub parameters_tested: usize,
    /// Approximate, informational only
    pub requests_issued: u64,
}

/// Inputs to `ScanSummary::tally` besides the findings themselves
#[derive(Debug, Clone)]
pub struct SummaryContext {
    pub scan_id: String,
    pub mode: ScanMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub locations_tested: usize,
    pub parameters_tested: usize,
    pub requests_issued: u64,
}

impl ScanSummary {
    /// Recompute the summary from scratch over `findings`.
    ///
    /// This is the only way counts are produced; they are never adjusted
    /// incrementally.
    pub fn tally(findings: &[Finding], ctx: SummaryContext) -> Self {
        let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();

        Self {
            scan_id: ctx.scan_id,
            mode: ctx.mode,
            start_time: ctx.start_time,
            end_time: ctx.end_time.max(ctx.start_time),
            total: findings.len(),
            critical: count(Severity::Critical),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            info: count(Severity::Info),
            locations_tested: ctx.locations_tested,
            parameters_tested: ctx.parameters_tested,
            requests_issued: ctx.requests_issued,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    /// Whether the severity counts partition the total
    pub fn is_consistent(&self) -> bool {
        self.critical + self.high + self.medium + self.low + self.info == self.total
    }

    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds().max(0)
    }

    /// Most severe level present, if any findings exist
    pub fn highest_severity(&self) -> Option<Severity> {
        Severity::DESCENDING
            .into_iter()
            .find(|s| self.count(*s) > 0)
    }
}

/// Target server fingerprint from the server-info phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powered_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub response_time_ms: u64,
}

/// Transport security observations from the certificate phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    pub https: bool,
    /// Whether the TLS handshake passed certificate verification
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Narrative analysis of the findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub summary: String,
    pub remediation: Vec<String>,
    pub generated_by: String,
}

/// A non-fatal failure recorded during a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseIssue {
    pub phase: String,
    pub message: String,
}

/// Aggregate root of a completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
    pub tested_locations: Vec<String>,
    pub config: ScanConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_info: Option<CertificateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<PhaseIssue>,
}

impl ScanResult {
    /// Host portion of the target, for titles and file names
    pub fn target_host(&self) -> String {
        url::Url::parse(&self.config.target_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.config.target_url.clone())
    }

    /// Findings ordered most severe first, stable within a severity
    pub fn findings_by_severity(&self) -> Vec<&Finding> {
        let mut ordered: Vec<&Finding> = self.findings.iter().collect();
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
        ordered
    }

    pub fn has_screenshots(&self) -> bool {
        self.findings.iter().any(|f| f.screenshot.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FindingBuilder, ScanResultBuilder};
    use crate::models::Category;

    fn ctx() -> SummaryContext {
        let now = Utc::now();
        SummaryContext {
            scan_id: "scan-1".to_string(),
            mode: ScanMode::Quick,
            start_time: now,
            end_time: now + chrono::Duration::seconds(42),
            locations_tested: 4,
            parameters_tested: 2,
            requests_issued: 17,
        }
    }

    #[test]
    fn test_tally_partitions_total() {
        let findings = vec![
            FindingBuilder::new(Category::SqlInjection)
                .severity(Severity::Critical)
                .build(),
            FindingBuilder::new(Category::Xss).severity(Severity::High).build(),
            FindingBuilder::new(Category::Xss).severity(Severity::High).build(),
            FindingBuilder::new(Category::SecurityHeaders)
                .severity(Severity::Low)
                .build(),
        ];

        let summary = ScanSummary::tally(&findings, ctx());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.medium, 0);
        assert_eq!(summary.low, 1);
        assert!(summary.is_consistent());
        assert_eq!(summary.highest_severity(), Some(Severity::Critical));
        assert_eq!(summary.duration_secs(), 42);
    }

    #[test]
    fn test_tally_empty() {
        let summary = ScanSummary::tally(&[], ctx());
        assert_eq!(summary.total, 0);
        assert!(summary.is_consistent());
        assert_eq!(summary.highest_severity(), None);
    }

    #[test]
    fn test_tally_clamps_end_before_start() {
        let mut c = ctx();
        c.end_time = c.start_time - chrono::Duration::seconds(5);
        let summary = ScanSummary::tally(&[], c);
        assert!(summary.end_time >= summary.start_time);
    }

    #[test]
    fn test_findings_by_severity() {
        let result = ScanResultBuilder::new("https://example.com")
            .finding(FindingBuilder::new(Category::Csrf).severity(Severity::Medium).build())
            .finding(FindingBuilder::new(Category::SqlInjection).severity(Severity::Critical).build())
            .build();

        let ordered = result.findings_by_severity();
        assert_eq!(ordered[0].severity, Severity::Critical);
        assert_eq!(ordered[1].severity, Severity::Medium);
        assert_eq!(result.target_host(), "example.com");
    }
}
