//! Test fixtures and builders for model types
//!
//! Provides builder patterns for creating test data with sensible defaults.
//! Import via `use crate::fixtures::*` in test modules.

#![allow(dead_code)] // Builder methods are available for future tests

use chrono::{DateTime, TimeZone, Utc};

use crate::catalog;
use crate::models::{
    AiAnalysis, Category, CertificateInfo, Finding, FindingStatus, PhaseIssue, ScanConfig,
    ScanMode, ScanResult, ScanSummary, ServerInfo, Severity, SummaryContext, TestToggles,
    finding_id,
};

/// Fixed timestamp so rendered fixtures are reproducible
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
        .single()
        .expect("valid fixture timestamp")
}

// ============================================================================
// FindingBuilder
// ============================================================================

/// Builder for creating test Finding instances.
///
/// # Example
/// ```ignore
/// let finding = FindingBuilder::new(Category::Xss)
///     .location("https://example.com/search?q=1")
///     .parameter("q")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct FindingBuilder {
    category: Category,
    severity: Severity,
    location: String,
    parameter: Option<String>,
    payload: Option<String>,
    evidence: String,
    screenshot: Option<String>,
    status: FindingStatus,
    seq: Option<usize>,
}

impl FindingBuilder {
    /// Create a new builder using catalog defaults for the category.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            severity: catalog::entry(category).default_severity,
            location: "https://example.com/".to_string(),
            parameter: None,
            payload: None,
            evidence: format!("{} evidence", category),
            screenshot: None,
            status: FindingStatus::Open,
            seq: None,
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
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

    pub fn screenshot(mut self, reference: impl Into<String>) -> Self {
        self.screenshot = Some(reference.into());
        self
    }

    pub fn status(mut self, status: FindingStatus) -> Self {
        self.status = status;
        self
    }

    /// Distinguish otherwise identical fixtures
    pub fn seq(mut self, seq: usize) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn build(self) -> Finding {
        let entry = catalog::entry(self.category);
        let location = match self.seq {
            Some(seq) => format!("{}#{}", self.location, seq),
            None => self.location,
        };
        Finding {
            id: finding_id(
                self.category,
                &location,
                self.parameter.as_deref(),
                self.payload.as_deref(),
                entry.title,
            ),
            category: self.category,
            severity: self.severity,
            title: entry.title.to_string(),
            location,
            parameter: self.parameter,
            payload: self.payload,
            description: entry.description.to_string(),
            evidence: self.evidence,
            remediation: entry.remediation.to_string(),
            cwe: entry.cwe_ids(),
            cvss: Some(entry.cvss),
            screenshot: self.screenshot,
            discovered_at: fixed_time(),
            status: self.status,
        }
    }
}

// ============================================================================
// ScanResultBuilder
// ============================================================================

/// Builder for creating test ScanResult instances with a consistent summary.
#[derive(Debug, Clone)]
pub struct ScanResultBuilder {
    config: ScanConfig,
    scan_id: String,
    findings: Vec<Finding>,
    tested_locations: Vec<String>,
    server_info: Option<ServerInfo>,
    certificate_info: Option<CertificateInfo>,
    ai_analysis: Option<AiAnalysis>,
    issues: Vec<PhaseIssue>,
}

impl ScanResultBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let mut config = ScanConfig::new(target.clone());
        config.mode = ScanMode::Standard;
        config.tests = TestToggles::all();
        Self {
            config,
            scan_id: "0b7c1e52-4f6a-4d3b-9a51-6f0c2d9e8a11".to_string(),
            findings: Vec::new(),
            tested_locations: vec![target],
            server_info: None,
            certificate_info: None,
            ai_analysis: None,
            issues: Vec::new(),
        }
    }

    pub fn scan_id(mut self, id: impl Into<String>) -> Self {
        self.scan_id = id.into();
        self
    }

    pub fn finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    pub fn findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings.extend(findings);
        self
    }

    pub fn tested_location(mut self, location: impl Into<String>) -> Self {
        self.tested_locations.push(location.into());
        self
    }

    pub fn server_info(mut self) -> Self {
        self.server_info = Some(ServerInfo {
            status_code: 200,
            server: Some("nginx/1.24.0".to_string()),
            powered_by: Some("PHP/8.2.1".to_string()),
            content_type: Some("text/html; charset=utf-8".to_string()),
            response_time_ms: 87,
        });
        self
    }

    pub fn certificate_info(mut self) -> Self {
        self.certificate_info = Some(CertificateInfo {
            https: true,
            verified: true,
            hsts: None,
            issuer: Some("R3".to_string()),
            expires_at: Some(fixed_time() + chrono::Duration::days(60)),
        });
        self
    }

    pub fn ai_analysis(mut self, summary: impl Into<String>) -> Self {
        self.ai_analysis = Some(AiAnalysis {
            summary: summary.into(),
            remediation: vec!["Fix the SQL injection first.".to_string()],
            generated_by: "fixture".to_string(),
        });
        self
    }

    pub fn issue(mut self, phase: &str, message: &str) -> Self {
        self.issues.push(PhaseIssue {
            phase: phase.to_string(),
            message: message.to_string(),
        });
        self
    }

    pub fn build(self) -> ScanResult {
        let start = fixed_time();
        let summary = ScanSummary::tally(
            &self.findings,
            SummaryContext {
                scan_id: self.scan_id,
                mode: self.config.mode,
                start_time: start,
                end_time: start + chrono::Duration::seconds(95),
                locations_tested: self.tested_locations.len(),
                parameters_tested: 3,
                requests_issued: 120,
            },
        );
        ScanResult {
            summary,
            findings: self.findings,
            tested_locations: self.tested_locations,
            config: self.config,
            server_info: self.server_info,
            certificate_info: self.certificate_info,
            ai_analysis: self.ai_analysis,
            recording: None,
            issues: self.issues,
        }
    }
}

/// A result with one finding of each severity, fully populated
pub fn sample_result() -> ScanResult {
    ScanResultBuilder::new("https://shop.example.com")
        .server_info()
        .certificate_info()
        .ai_analysis("Five findings; SQL injection on /products is the priority.")
        .finding(
            FindingBuilder::new(Category::SqlInjection)
                .location("https://shop.example.com/products?id=1")
                .parameter("id")
                .payload("' OR '1'='1")
                .evidence("You have an error in your SQL syntax")
                .build(),
        )
        .finding(
            FindingBuilder::new(Category::Xss)
                .location("https://shop.example.com/search?q=test")
                .parameter("q")
                .payload("<script>alert('vs-xss')</script>")
                .evidence("<div>\"quoted\", with comma</div>")
                .build(),
        )
        .finding(
            FindingBuilder::new(Category::Csrf)
                .location("https://shop.example.com/account")
                .build(),
        )
        .finding(
            FindingBuilder::new(Category::SecurityHeaders)
                .location("https://shop.example.com/")
                .parameter("x-frame-options")
                .build(),
        )
        .finding(
            FindingBuilder::new(Category::InfoDisclosure)
                .severity(Severity::Info)
                .location("https://shop.example.com/")
                .parameter("server")
                .evidence("line one\nline two")
                .build(),
        )
        .build()
}
