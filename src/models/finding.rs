//! Finding model: a single detected issue

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Vulnerability category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "XSS")]
    Xss,
    #[serde(rename = "SQLInjection")]
    SqlInjection,
    #[serde(rename = "CSRF")]
    Csrf,
    SecurityHeaders,
    FileUpload,
    PathTraversal,
    InfoDisclosure,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Xss,
        Category::SqlInjection,
        Category::Csrf,
        Category::SecurityHeaders,
        Category::FileUpload,
        Category::PathTraversal,
        Category::InfoDisclosure,
    ];

    /// Short machine-friendly code used in ids and CSV output
    pub fn code(&self) -> &'static str {
        match self {
            Category::Xss => "xss",
            Category::SqlInjection => "sqli",
            Category::Csrf => "csrf",
            Category::SecurityHeaders => "headers",
            Category::FileUpload => "upload",
            Category::PathTraversal => "traversal",
            Category::InfoDisclosure => "info-disclosure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Xss => "Cross-Site Scripting",
            Category::SqlInjection => "SQL Injection",
            Category::Csrf => "Cross-Site Request Forgery",
            Category::SecurityHeaders => "Security Headers",
            Category::FileUpload => "File Upload",
            Category::PathTraversal => "Path Traversal",
            Category::InfoDisclosure => "Information Disclosure",
        };
        f.write_str(name)
    }
}

/// Severity of a finding, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Capitalized label for human output
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage lifecycle of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingStatus {
    #[default]
    Open,
    Confirmed,
    FalsePositive,
    Resolved,
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingStatus::Open => "open",
            FindingStatus::Confirmed => "confirmed",
            FindingStatus::FalsePositive => "false-positive",
            FindingStatus::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

/// A single detected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Stable identifier derived from the finding's content
    pub id: String,

    pub category: Category,

    pub severity: Severity,

    /// Short title (usually the catalog title)
    pub title: String,

    /// URL where the issue was observed
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    pub description: String,

    /// Raw response fragment or observation
    pub evidence: String,

    pub remediation: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cwe: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,

    pub discovered_at: DateTime<Utc>,

    #[serde(default)]
    pub status: FindingStatus,
}

impl Finding {
    /// CWE identifiers joined for single-cell output
    pub fn cwe_list(&self) -> String {
        self.cwe.join(", ")
    }
}

/// Compute the stable identifier of a finding.
///
/// SHA-256 over category, location, parameter, payload and title, truncated to
/// 12 hex digits. Identical observations always map to the same id.
pub fn finding_id(
    category: Category,
    location: &str,
    parameter: Option<&str>,
    payload: Option<&str>,
    title: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(category.code().as_bytes());
    hasher.update(b"|");
    hasher.update(location.as_bytes());
    hasher.update(b"|");
    if let Some(param) = parameter {
        hasher.update(param.as_bytes());
    }
    hasher.update(b"|");
    if let Some(payload) = payload {
        hasher.update(payload.as_bytes());
    }
    hasher.update(b"|");
    hasher.update(title.as_bytes());

    let digest = format!("{:x}", hasher.finalize());
    format!("F-{}", &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_id_deterministic() {
        let a = finding_id(
            Category::Xss,
            "https://example.com/search?q=1",
            Some("q"),
            Some("<script>alert(1)</script>"),
            "Reflected XSS",
        );
        let b = finding_id(
            Category::Xss,
            "https://example.com/search?q=1",
            Some("q"),
            Some("<script>alert(1)</script>"),
            "Reflected XSS",
        );
        assert_eq!(a, b);
        assert!(a.starts_with("F-"));
        assert_eq!(a.len(), 14);
    }

    #[test]
    fn test_finding_id_distinguishes_parameter() {
        let a = finding_id(Category::Xss, "https://x.test/", Some("q"), None, "t");
        let b = finding_id(Category::Xss, "https://x.test/", Some("id"), None, "t");
        let c = finding_id(Category::Xss, "https://x.test/", None, None, "t");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::DESCENDING[0], Severity::Critical);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::SqlInjection).unwrap();
        assert_eq!(json, "\"SQLInjection\"");
        let back: Category = serde_json::from_str("\"XSS\"").unwrap();
        assert_eq!(back, Category::Xss);
    }

    #[test]
    fn test_status_serde_kebab() {
        let json = serde_json::to_string(&FindingStatus::FalsePositive).unwrap();
        assert_eq!(json, "\"false-positive\"");
        assert_eq!(FindingStatus::default(), FindingStatus::Open);
    }
}
