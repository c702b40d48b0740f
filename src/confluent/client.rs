//! Confluent Cloud Client
//!
//! Main client for interacting with the Confluent Cloud management APIs,
//! combining authentication, HTTP functionality and URL construction.

use super::auth::CloudCredentials;
use super::http::ConfluentHttpClient;
use crate::config::ProviderConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Poll interval used for every wait while in acceptance-test mode
const ACCEPTANCE_TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Main Confluent Cloud client
#[derive(Clone)]
pub struct ConfluentClient {
    pub http: ConfluentHttpClient,
    pub endpoint: String,
    pub acceptance_test_mode: bool,
}

impl ConfluentClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let credentials = CloudCredentials::from_config(config)
            .context("Failed to initialize Confluent Cloud credentials")?;

        let http = ConfluentHttpClient::new(credentials).context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.effective_endpoint(),
            acceptance_test_mode: config.acceptance_test_mode,
        })
    }

    /// Poll interval for a resource, shortened in acceptance-test mode
    pub fn poll_interval(&self, normal: Duration) -> Duration {
        if self.acceptance_test_mode {
            ACCEPTANCE_TEST_POLL_INTERVAL
        } else {
            normal
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    // =========================================================================
    // Org API
    // =========================================================================

    /// Build Org API URL
    pub fn org_url(&self, path: &str) -> String {
        self.url(&format!("org/v2/{}", path))
    }

    // =========================================================================
    // IAM API
    // =========================================================================

    /// Build IAM API URL
    pub fn iam_url(&self, path: &str) -> String {
        self.url(&format!("iam/v2/{}", path))
    }

    // =========================================================================
    // Kafka cluster management (CMK) API
    // =========================================================================

    /// Build CMK API URL
    pub fn cmk_url(&self, path: &str) -> String {
        self.url(&format!("cmk/v2/{}", path))
    }

    // =========================================================================
    // Stream Governance (SRCM) API
    // =========================================================================

    /// Build SRCM API URL
    pub fn srcm_url(&self, path: &str) -> String {
        self.url(&format!("srcm/v2/{}", path))
    }

    // =========================================================================
    // Networking API
    // =========================================================================

    /// Build Networking API URL
    pub fn networking_url(&self, path: &str) -> String {
        self.url(&format!("networking/v1/{}", path))
    }

    // =========================================================================
    // Connect API
    // =========================================================================

    /// Build the connectors collection URL of a Kafka cluster
    pub fn connectors_url(&self, environment_id: &str, cluster_id: &str) -> String {
        self.url(&format!(
            "connect/v1/environments/{}/clusters/{}/connectors",
            urlencoding::encode(environment_id),
            urlencoding::encode(cluster_id)
        ))
    }

    /// Build the URL of a single connector (name is path-encoded)
    pub fn connector_url(&self, environment_id: &str, cluster_id: &str, name: &str) -> String {
        format!(
            "{}/{}",
            self.connectors_url(environment_id, cluster_id),
            urlencoding::encode(name)
        )
    }
}
