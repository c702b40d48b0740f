//! Provider
//!
//! Owns the configured client and resolves type names to resources and
//! data sources. The client is shared read-only across concurrent
//! operations.

use crate::config::ProviderConfig;
use crate::confluent::client::ConfluentClient;
use crate::error::ProviderError;
use crate::lifecycle::{read_data_source, Lifecycle, LifecycleState, ResourceInstance};
use crate::resource::{get_data_source, get_resource, DataSource, Resource};
use crate::schema::ResourceData;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Configured provider
#[derive(Clone)]
pub struct Provider {
    client: Arc<ConfluentClient>,
}

impl Provider {
    /// Configure from provider configuration; fails on missing credentials
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = ConfluentClient::new(config)?;
        tracing::info!("Provider configured for {}", client.endpoint);
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: ConfluentClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &ConfluentClient {
        &self.client
    }

    pub fn resource(&self, type_name: &str) -> Result<&'static dyn Resource, ProviderError> {
        get_resource(type_name).ok_or_else(|| {
            ProviderError::validation(format!("unknown resource type {:?}", type_name))
        })
    }

    pub fn data_source(&self, type_name: &str) -> Result<&'static dyn DataSource, ProviderError> {
        get_data_source(type_name).ok_or_else(|| {
            ProviderError::validation(format!("unknown data source type {:?}", type_name))
        })
    }

    /// Lifecycle driver for one resource type
    pub fn lifecycle(&self, type_name: &str) -> Result<Lifecycle<'_>, ProviderError> {
        Ok(Lifecycle::new(self.resource(type_name)?, &self.client))
    }

    /// Decode declared configuration of a resource type
    pub fn declared(&self, type_name: &str, config: &Value) -> Result<ResourceData, ProviderError> {
        ResourceData::from_json(&self.resource(type_name)?.schema(), config)
    }

    /// Run a data source against declared configuration
    pub async fn read_data(&self, type_name: &str, config: &Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(type_name)?;
        let schema = data_source.schema();
        let declared = ResourceData::from_json(&schema, config)?;
        let data = read_data_source(data_source, &self.client, declared).await?;
        Ok(data.to_json(&schema))
    }
}

/// A tracked resource as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub attributes: Value,
    /// Created remotely, but never became ready
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tainted: bool,
    pub written_at: DateTime<Utc>,
}

impl StoredState {
    pub fn capture(resource: &dyn Resource, instance: &ResourceInstance) -> Self {
        Self {
            resource_type: resource.type_name().to_string(),
            id: instance.data.id().to_string(),
            attributes: instance.data.to_json(&resource.schema()),
            tainted: instance.state == LifecycleState::Tainted,
            written_at: Utc::now(),
        }
    }

    /// Back to a managed instance
    pub fn restore(&self, resource: &dyn Resource) -> Result<ResourceInstance, ProviderError> {
        let mut data = ResourceData::from_json(&resource.schema(), &self.attributes)?;
        data.set_id(&self.id);
        let mut instance = ResourceInstance::managed(data);
        if self.tainted {
            instance.state = LifecycleState::Tainted;
        }
        Ok(instance)
    }

    /// Whether the resource is still tracked
    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }
}
