//! Console configuration

use complaint_client::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConsoleError, Result};

/// Settings loaded from `complaint-console.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the REST API, including the `/api` prefix
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Complaints per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Edit lock lifetime in seconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Near-bottom distance that triggers the next page (pixels)
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold_px: f64,

    /// Where the signed-in session is kept between runs
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

fn default_api_url() -> String {
    ClientConfig::default().base_url
}
fn default_request_timeout() -> u64 { 30 }
fn default_page_size() -> u64 { 10 }
fn default_lock_ttl() -> u64 { 300 }
fn default_scroll_threshold() -> f64 { 100.0 }
fn default_session_file() -> PathBuf {
    PathBuf::from(".complaint-console/session.json")
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            lock_ttl_secs: default_lock_ttl(),
            scroll_threshold_px: default_scroll_threshold(),
            session_file: default_session_file(),
        }
    }
}

impl ConsoleConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(ConsoleError::Config("api_url must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(ConsoleError::Config("page_size must be at least 1".into()));
        }
        if self.lock_ttl_secs == 0 {
            return Err(ConsoleError::Config("lock_ttl_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConsoleConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.lock_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "api_url = \"https://complaints.example.org/api\"\npage_size = 25\n").unwrap();

        let config = ConsoleConfig::load(&path).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.lock_ttl_secs, 300);
        assert_eq!(config.client_config().base_url, "https://complaints.example.org/api");
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "page_size = 0\n").unwrap();

        assert!(matches!(ConsoleConfig::load(&path), Err(ConsoleError::Config(_))));
    }
}
