//! Scan configuration supplied by the caller

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::finding::Category;
use crate::error::ScanError;

/// Deepest crawl accepted by validation
pub const MAX_CRAWL_DEPTH: u32 = 10;

/// Largest concurrency hint accepted by validation
pub const MAX_THREADS: usize = 64;

/// Scan intensity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Few locations and payloads per category
    Quick,
    /// Balanced coverage
    #[default]
    Standard,
    /// Every discovered location with every payload
    Thorough,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanMode::Quick => "quick",
            ScanMode::Standard => "standard",
            ScanMode::Thorough => "thorough",
        };
        f.write_str(s)
    }
}

/// Test categories that can be toggled per scan
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    /// Reflected cross-site scripting
    Xss,
    /// SQL injection
    Sqli,
    /// Cross-site request forgery
    Csrf,
    /// HTTP security header audit
    Headers,
    /// File upload form audit
    Upload,
}

impl TestCategory {
    /// Categories in pipeline order
    pub const ALL: [TestCategory; 5] = [
        TestCategory::Xss,
        TestCategory::Sqli,
        TestCategory::Csrf,
        TestCategory::Headers,
        TestCategory::Upload,
    ];

    /// Primary finding category produced by this test
    pub fn finding_category(&self) -> Category {
        match self {
            TestCategory::Xss => Category::Xss,
            TestCategory::Sqli => Category::SqlInjection,
            TestCategory::Csrf => Category::Csrf,
            TestCategory::Headers => Category::SecurityHeaders,
            TestCategory::Upload => Category::FileUpload,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestCategory::Xss => "XSS",
            TestCategory::Sqli => "SQL injection",
            TestCategory::Csrf => "CSRF",
            TestCategory::Headers => "Security header",
            TestCategory::Upload => "File upload",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-category test switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestToggles {
    pub xss: bool,
    pub sql_injection: bool,
    pub csrf: bool,
    pub security_headers: bool,
    pub file_upload: bool,
}

impl Default for TestToggles {
    fn default() -> Self {
        Self::all()
    }
}

impl TestToggles {
    pub fn all() -> Self {
        Self {
            xss: true,
            sql_injection: true,
            csrf: true,
            security_headers: true,
            file_upload: true,
        }
    }

    pub fn none() -> Self {
        Self {
            xss: false,
            sql_injection: false,
            csrf: false,
            security_headers: false,
            file_upload: false,
        }
    }

    /// Enable exactly the given categories
    pub fn only(categories: &[TestCategory]) -> Self {
        let mut toggles = Self::none();
        for category in categories {
            toggles.set(*category, true);
        }
        toggles
    }

    pub fn is_enabled(&self, category: TestCategory) -> bool {
        match category {
            TestCategory::Xss => self.xss,
            TestCategory::Sqli => self.sql_injection,
            TestCategory::Csrf => self.csrf,
            TestCategory::Headers => self.security_headers,
            TestCategory::Upload => self.file_upload,
        }
    }

    pub fn set(&mut self, category: TestCategory, enabled: bool) {
        match category {
            TestCategory::Xss => self.xss = enabled,
            TestCategory::Sqli => self.sql_injection = enabled,
            TestCategory::Csrf => self.csrf = enabled,
            TestCategory::Headers => self.security_headers = enabled,
            TestCategory::Upload => self.file_upload = enabled,
        }
    }

    /// Enabled categories in pipeline order
    pub fn enabled(&self) -> Vec<TestCategory> {
        TestCategory::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// Credentials for authenticated scanning.
///
/// The password is never serialized, so archived results and reports do not
/// carry it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Input to a scan, immutable once the scan starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    pub target_url: String,

    #[serde(default)]
    pub mode: ScanMode,

    #[serde(default)]
    pub tests: TestToggles,

    pub crawl_depth: u32,

    pub threads: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Credentials>,

    #[serde(default)]
    pub screenshots: bool,

    #[serde(default)]
    pub record_video: bool,

    #[serde(default)]
    pub ai_analysis: bool,

    /// Fixed seed for deterministic sampling; derived from the session id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ScanConfig {
    /// Config with default options for the given target
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            mode: ScanMode::default(),
            tests: TestToggles::default(),
            crawl_depth: 2,
            threads: 8,
            auth: None,
            screenshots: false,
            record_video: false,
            ai_analysis: false,
            seed: None,
        }
    }

    /// Check the config and return the parsed target URL.
    ///
    /// The URL must be absolute with an http or https scheme and a host; depth
    /// and thread count must be positive and within bounds.
    pub fn validate(&self) -> Result<Url, ScanError> {
        let url = Url::parse(self.target_url.trim()).map_err(|e| {
            ScanError::InvalidConfig(format!("target URL '{}': {}", self.target_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScanError::InvalidConfig(format!(
                "target URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidConfig(format!(
                "target URL '{}' has no host",
                self.target_url
            )));
        }

        if self.crawl_depth == 0 || self.crawl_depth > MAX_CRAWL_DEPTH {
            return Err(ScanError::InvalidConfig(format!(
                "crawl depth must be between 1 and {}, got {}",
                MAX_CRAWL_DEPTH, self.crawl_depth
            )));
        }

        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ScanError::InvalidConfig(format!(
                "thread count must be between 1 and {}, got {}",
                MAX_THREADS, self.threads
            )));
        }

        if self
            .auth
            .as_ref()
            .is_some_and(|auth| auth.username.trim().is_empty())
        {
            return Err(ScanError::InvalidConfig(
                "auth username must not be empty".to_string(),
            ));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_https_url() {
        let config = ScanConfig::new("https://example.com");
        let url = config.validate().unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let config = ScanConfig::new("not-a-url");
        match config.validate() {
            Err(ScanError::InvalidConfig(msg)) => assert!(msg.contains("not-a-url")),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = ScanConfig::new("ftp://example.com/files");
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_depth_bounds() {
        let mut config = ScanConfig::new("https://example.com");
        config.crawl_depth = 0;
        assert!(config.validate().is_err());

        config.crawl_depth = MAX_CRAWL_DEPTH + 1;
        assert!(config.validate().is_err());

        config.crawl_depth = MAX_CRAWL_DEPTH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_thread_bounds() {
        let mut config = ScanConfig::new("https://example.com");
        config.threads = 0;
        assert!(config.validate().is_err());

        config.threads = MAX_THREADS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_username() {
        let mut config = ScanConfig::new("https://example.com");
        config.auth = Some(Credentials {
            username: "  ".to_string(),
            password: "secret".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toggles_only() {
        let toggles = TestToggles::only(&[TestCategory::Xss, TestCategory::Headers]);
        assert!(toggles.xss);
        assert!(toggles.security_headers);
        assert!(!toggles.sql_injection);
        assert_eq!(
            toggles.enabled(),
            vec![TestCategory::Xss, TestCategory::Headers]
        );
    }

    #[test]
    fn test_password_not_serialized() {
        let mut config = ScanConfig::new("https://example.com");
        config.auth = Some(Credentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        });
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("admin"));
        assert!(!json.contains("hunter2"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
    }
}
