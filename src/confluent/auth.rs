//! Confluent Cloud Authentication
//!
//! Cloud API key/secret pair used for HTTP basic auth against the
//! management APIs.

use crate::config::{ProviderConfig, ENV_CLOUD_API_KEY, ENV_CLOUD_API_SECRET};
use anyhow::{bail, Result};
use std::fmt;

/// Cloud API credentials
#[derive(Clone)]
pub struct CloudCredentials {
    pub api_key: String,
    api_secret: String,
}

impl CloudCredentials {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Resolve credentials from provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let key = config.cloud_api_key.as_deref().unwrap_or_default();
        let secret = config.cloud_api_secret.as_deref().unwrap_or_default();

        match (key.is_empty(), secret.is_empty()) {
            (true, true) => bail!(
                "Cloud API credentials are not configured. Set {} and {}",
                ENV_CLOUD_API_KEY,
                ENV_CLOUD_API_SECRET
            ),
            (true, false) | (false, true) => bail!(
                "Both {} and {} must be set together",
                ENV_CLOUD_API_KEY,
                ENV_CLOUD_API_SECRET
            ),
            _ => {}
        }

        if !validate_api_key(key) {
            bail!("{} has an invalid format", ENV_CLOUD_API_KEY);
        }

        Ok(Self::new(key, secret))
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

// Security: never print the secret
impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// API keys are short ASCII alphanumeric tokens
fn validate_api_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= 64 && key.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>, secret: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            cloud_api_key: key.map(str::to_string),
            cloud_api_secret: secret.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(CloudCredentials::from_config(&config(None, None)).is_err());
        assert!(CloudCredentials::from_config(&config(Some("ABC"), None)).is_err());
        assert!(CloudCredentials::from_config(&config(None, Some("s"))).is_err());
    }

    #[test]
    fn test_malformed_key_rejected() {
        let err = CloudCredentials::from_config(&config(Some("bad key!"), Some("s"))).unwrap_err();
        assert!(err.to_string().contains("invalid format"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = CloudCredentials::from_config(&config(Some("ABCDEF123"), Some("hunter2"))).unwrap();
        let printed = format!("{:?}", creds);
        assert!(printed.contains("ABCDEF123"));
        assert!(!printed.contains("hunter2"));
    }
}
