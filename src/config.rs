//! Configuration Management
//!
//! Provider configuration: endpoint, Cloud API credentials and the
//! acceptance-test switch. Values resolve CLI flag > environment > file >
//! default.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Public Confluent Cloud API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.confluent.cloud";

pub const ENV_CLOUD_API_KEY: &str = "CONFLUENT_CLOUD_API_KEY";
pub const ENV_CLOUD_API_SECRET: &str = "CONFLUENT_CLOUD_API_SECRET";
pub const ENV_ENDPOINT: &str = "CONFLUENT_CLOUD_ENDPOINT";
/// Secret of an API key being imported (the server never returns it)
pub const ENV_IMPORT_API_KEY_SECRET: &str = "API_KEY_SECRET";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Base URL of the Confluent Cloud API
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Cloud API key
    #[serde(default)]
    pub cloud_api_key: Option<String>,
    /// Cloud API secret
    #[serde(default, skip_serializing)]
    pub cloud_api_secret: Option<String>,
    /// Shrinks poll intervals so provisioning waits finish quickly in tests
    #[serde(default)]
    pub acceptance_test_mode: bool,
}

impl ProviderConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tfconfluent").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk. The API secret is never written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Overlay environment variables on top of file values
    pub fn with_env(mut self) -> Self {
        if let Some(key) = non_empty_env(ENV_CLOUD_API_KEY) {
            self.cloud_api_key = Some(key);
        }
        if let Some(secret) = non_empty_env(ENV_CLOUD_API_SECRET) {
            self.cloud_api_secret = Some(secret);
        }
        if let Some(endpoint) = non_empty_env(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        self
    }

    /// Get effective endpoint, without a trailing slash
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Read an environment variable, treating an empty value as unset
pub fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
