//! Configuration management for vulnscope

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::models::ScanMode;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Defaults applied to scans when flags are not given
    #[serde(default)]
    pub defaults: ScanDefaults,

    /// HTTP probe behaviour
    #[serde(default)]
    pub http: HttpSettings,

    /// Per-phase time limits
    #[serde(default)]
    pub timeouts: PhaseTimeouts,

    /// Session and archive retention
    #[serde(default)]
    pub retention: Retention,

    /// Report output
    #[serde(default)]
    pub report: ReportSettings,
}

/// Scan option defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDefaults {
    #[serde(default)]
    pub mode: ScanMode,

    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,

    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_crawl_depth() -> u32 {
    2
}

fn default_threads() -> usize {
    8
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            mode: ScanMode::default(),
            crawl_depth: default_crawl_depth(),
            threads: default_threads(),
        }
    }
}

/// HTTP probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Timeout of a single request, in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on requests per second sent to the target
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Skip TLS certificate verification (self-signed staging targets)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("vulnscope/{}", env!("CARGO_PKG_VERSION"))
}

fn default_requests_per_second() -> u32 {
    20
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            requests_per_second: default_requests_per_second(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Time limits for each class of pipeline phase, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimeouts {
    #[serde(default = "default_recon_timeout")]
    pub recon_secs: u64,

    #[serde(default = "default_discovery_timeout")]
    pub discovery_secs: u64,

    #[serde(default = "default_module_timeout")]
    pub module_secs: u64,

    #[serde(default = "default_analysis_timeout")]
    pub analysis_secs: u64,

    #[serde(default = "default_capture_timeout")]
    pub capture_secs: u64,
}

fn default_recon_timeout() -> u64 {
    20
}

fn default_discovery_timeout() -> u64 {
    120
}

fn default_module_timeout() -> u64 {
    300
}

fn default_analysis_timeout() -> u64 {
    60
}

fn default_capture_timeout() -> u64 {
    120
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            recon_secs: default_recon_timeout(),
            discovery_secs: default_discovery_timeout(),
            module_secs: default_module_timeout(),
            analysis_secs: default_analysis_timeout(),
            capture_secs: default_capture_timeout(),
        }
    }
}

/// Retention bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retention {
    /// How long a finished session stays queryable, in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Most finished sessions kept in memory
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Days an archived result is kept on disk
    #[serde(default = "default_archive_days")]
    pub archive_days: u32,
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    50
}

fn default_archive_days() -> u32 {
    30
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
            archive_days: default_archive_days(),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Title printed on reports; the target host is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Directory reports are written to; the working directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".vulnscope").join("config.yaml"))
    }

    /// The explicit path when given, otherwise the default location
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration, falling back to defaults.
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub fn load_at(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Reject values no scan could run with
    pub fn validate(&self) -> Result<()> {
        if self.http.requests_per_second == 0 {
            return Err(
                ConfigError::Invalid("http.requests_per_second must be positive".to_string())
                    .into(),
            );
        }
        if self.retention.max_sessions == 0 {
            return Err(
                ConfigError::Invalid("retention.max_sessions must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.retention.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.mode, ScanMode::Standard);
        assert_eq!(config.defaults.crawl_depth, 2);
        assert_eq!(config.http.requests_per_second, 20);
        assert_eq!(config.timeouts.recon_secs, 20);
        assert_eq!(config.retention.max_sessions, 50);
        assert!(config.report.output_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "defaults:\n  mode: quick\nhttp:\n  timeout_secs: 3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.defaults.mode, ScanMode::Quick);
        assert_eq!(config.defaults.threads, 8);
        assert_eq!(config.http.timeout(), Duration::from_secs(3));
        assert_eq!(config.retention.archive_days, 30);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.report.title = Some("Quarterly assessment".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let explicit = Path::new("/etc/vulnscope.yaml");
        assert_eq!(
            Config::resolve_path(Some(explicit)).unwrap(),
            PathBuf::from("/etc/vulnscope.yaml")
        );
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = Config::load_at(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "http:\n  requests_per_second: 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        Config::default().save_to(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
