//! `confluent_environment`

use crate::confluent::client::ConfluentClient;
use crate::confluent::models::ObjectMeta;
use crate::error::{Operation, ProviderError};
use crate::resource::Resource;
use crate::resources::request_body;
use crate::schema::{AttrKind, AttrValue, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DISPLAY_NAME: &str = "Environment";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamGovernanceConfig {
    pub package: String,
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_governance_config: Option<StreamGovernanceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Environment {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub stream_governance_config: Option<StreamGovernanceConfig>,
}

pub struct EnvironmentResource;

impl EnvironmentResource {
    pub fn to_api_request(data: &ResourceData) -> EnvironmentRequest {
        EnvironmentRequest {
            display_name: data.get_str("display_name").map(str::to_string),
            stream_governance_config: data
                .block_str("stream_governance", "package")
                .map(|package| StreamGovernanceConfig {
                    package: package.to_string(),
                }),
        }
    }

    pub fn apply_response(data: &mut ResourceData, environment: &Environment) {
        data.set_id(&environment.id);
        data.set("display_name", environment.display_name.as_str());
        data.set("resource_name", environment.metadata.resource_name.clone());
        match &environment.stream_governance_config {
            Some(config) => {
                let mut block = BTreeMap::new();
                block.insert("package".to_string(), AttrValue::from(config.package.as_str()));
                data.set_block("stream_governance", block);
            }
            None => data.clear_block("stream_governance"),
        }
    }

    pub async fn fetch(client: &ConfluentClient, id: &str) -> Result<Environment, ProviderError> {
        client
            .http
            .get(&client.org_url(&format!("environments/{}", id)), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, id, e))
    }
}

pub fn stream_governance_schema() -> Schema {
    Schema::new().with(
        "package",
        Attribute::required(AttrKind::String).describe("ESSENTIALS or ADVANCED"),
    )
}

#[async_trait]
impl Resource for EnvironmentResource {
    fn type_name(&self) -> &'static str {
        "confluent_environment"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "display_name",
                Attribute::required(AttrKind::String).describe("A human-readable name for the Environment"),
            )
            .with(
                "stream_governance",
                Attribute::optional_computed(AttrKind::block(stream_governance_schema())),
            )
            .with(
                "resource_name",
                Attribute::computed(AttrKind::String).describe("The Confluent Resource Name of the Environment"),
            )
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["display_name", "stream_governance"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["environment_id"]
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: Environment = client
            .http
            .post(&client.org_url("environments"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Finished creating {} {:?}", DISPLAY_NAME, created.id);
        Self::apply_response(data, &created);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let environment = Self::fetch(client, data.id()).await?;
        Self::apply_response(data, &environment);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        _prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;
        let updated: Environment = client
            .http
            .patch(&client.org_url(&format!("environments/{}", data.id())), &[], &body)
            .await
            .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, data.id(), e))?;

        tracing::info!("Finished updating {} {:?}", DISPLAY_NAME, updated.id);
        Self::apply_response(data, &updated);
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        client
            .http
            .delete(&client.org_url(&format!("environments/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_from_declared_state() {
        let data = ResourceData::from_json(
            &EnvironmentResource.schema(),
            &json!({"display_name": "prod", "stream_governance": {"package": "ADVANCED"}}),
        )
        .unwrap();

        let request = EnvironmentResource::to_api_request(&data);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"display_name": "prod", "stream_governance_config": {"package": "ADVANCED"}})
        );
    }

    #[test]
    fn test_request_omits_unset_governance() {
        let mut data = ResourceData::new();
        data.set("display_name", "dev");
        let request = EnvironmentResource::to_api_request(&data);
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"display_name": "dev"}));
    }

    #[test]
    fn test_apply_response() {
        let environment: Environment = serde_json::from_value(json!({
            "api_version": "org/v2",
            "kind": "Environment",
            "id": "env-abc123",
            "display_name": "prod",
            "metadata": {"resource_name": "crn://confluent.cloud/organization=o-1/environment=env-abc123"},
            "stream_governance_config": {"package": "ESSENTIALS"}
        }))
        .unwrap();

        let mut data = ResourceData::new();
        EnvironmentResource::apply_response(&mut data, &environment);
        assert_eq!(data.id(), "env-abc123");
        assert_eq!(data.block_str("stream_governance", "package"), Some("ESSENTIALS"));
        assert_eq!(
            data.get_str("resource_name"),
            Some("crn://confluent.cloud/organization=o-1/environment=env-abc123")
        );
    }
}
