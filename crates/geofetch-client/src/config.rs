//! Client configuration.
//!
//! Loaded from YAML, then overridden by `GEOFETCH_*` environment variables:
//!
//! ```yaml
//! project: my-cloud-project
//! max_workers: 8
//! retry:
//!   max_attempts: 5
//!   initial_delay_ms: 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::transport::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://earthengine.googleapis.com/v1beta";

pub const ENV_PROJECT: &str = "GEOFETCH_PROJECT";
pub const ENV_API_BASE_URL: &str = "GEOFETCH_API_BASE_URL";
pub const ENV_MAX_WORKERS: &str = "GEOFETCH_MAX_WORKERS";
pub const ENV_TOKEN_FILE: &str = "GEOFETCH_TOKEN_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cloud project the requests are billed to.
    pub project: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Upper bound on concurrent requests in a batched fetch.
    pub max_workers: usize,
    pub retry: RetrySettings,
    /// File holding a bearer token, re-read on every request.
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            max_workers: 5,
            retry: RetrySettings::default(),
            token_file: None,
        }
    }
}

/// Serialized form of [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_elapsed_secs: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            max_elapsed_secs: 300,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_elapsed: Duration::from_secs(self.max_elapsed_secs),
            jitter: self.jitter,
        }
    }
}

impl ClientConfig {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> FetchResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load a YAML file, then apply environment overrides.
    pub fn from_yaml_file(path: &Path) -> FetchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FetchError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml_str(&content)
            .map_err(|e| FetchError::config(format!("{}: {}", path.display(), e)))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        debug!(path = %path.display(), project = %config.project, "Loaded client config");
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> FetchResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| FetchError::config(e.to_string()))
    }

    /// Apply `GEOFETCH_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> FetchResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup(ENV_PROJECT) {
            self.project = project;
        }
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(workers) = lookup(ENV_MAX_WORKERS) {
            self.max_workers = workers.trim().parse().map_err(|_| {
                FetchError::config(format!("{} must be an integer, got '{}'", ENV_MAX_WORKERS, workers))
            })?;
        }
        if let Some(path) = lookup(ENV_TOKEN_FILE) {
            self.token_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> FetchResult<()> {
        if self.project.trim().is_empty() {
            return Err(FetchError::config(format!(
                "project is required (set it in the config file or {})",
                ENV_PROJECT
            )));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(FetchError::config("api_base_url is empty"));
        }
        if self.max_workers == 0 {
            return Err(FetchError::config("max_workers must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(FetchError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// `{api_base_url}/projects/{project}/{method}`
    pub fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.project,
            method
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
project: my-project
max_workers: 8
retry:
  max_attempts: 3
  jitter: false
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.project, "my-project");
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.retry.jitter);
        assert_eq!(config.retry.max_elapsed_secs, 300);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PROJECT, "env-project"),
            (ENV_MAX_WORKERS, "12"),
            (ENV_TOKEN_FILE, "/run/secrets/token"),
        ]
        .into_iter()
        .collect();
        let mut config = ClientConfig::for_project("file-project");
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.project, "env-project");
        assert_eq!(config.max_workers, 12);
        assert_eq!(config.token_file, Some(PathBuf::from("/run/secrets/token")));
    }

    #[test]
    fn test_bad_worker_override() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_MAX_WORKERS).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::default().validate().is_err());
        assert!(ClientConfig::for_project("p").validate().is_ok());

        let mut config = ClientConfig::for_project("p");
        config.max_workers = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::for_project("p");
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint() {
        let mut config = ClientConfig::for_project("p");
        config.api_base_url = "http://localhost:9000/v1/".to_string();
        assert_eq!(
            config.endpoint("value:compute"),
            "http://localhost:9000/v1/projects/p/value:compute"
        );
    }
}
