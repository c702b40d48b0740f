//! `confluent_schema_registry_cluster`

use crate::confluent::client::ConfluentClient;
use crate::confluent::models::{ObjectMeta, ObjectReference};
use crate::error::{Operation, ProviderError};
use crate::lifecycle::{Observation, ProvisioningHandle, Target};
use crate::resource::Resource;
use crate::resources::{environment_id, request_body};
use crate::schema::{id_block, AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DISPLAY_NAME: &str = "Schema Registry Cluster";

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaRegistryRequestSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaRegistryRequest {
    pub spec: SchemaRegistryRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaRegistrySpec {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub http_endpoint: String,
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub environment: Option<ObjectReference>,
    #[serde(default)]
    pub region: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaRegistryStatus {
    #[serde(default)]
    pub phase: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaRegistryCluster {
    pub id: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub spec: SchemaRegistrySpec,
    #[serde(default)]
    pub status: SchemaRegistryStatus,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

pub struct SchemaRegistryClusterResource;

impl SchemaRegistryClusterResource {
    pub fn to_api_request(data: &ResourceData) -> SchemaRegistryRequest {
        SchemaRegistryRequest {
            spec: SchemaRegistryRequestSpec {
                package: data.get_str("package").map(str::to_string),
                environment: data.block_str("environment", "id").map(ObjectReference::new),
                region: data.block_str("region", "id").map(ObjectReference::new),
            },
        }
    }

    pub fn apply_response(data: &mut ResourceData, cluster: &SchemaRegistryCluster) {
        data.set_id(&cluster.id);
        data.set("api_version", cluster.api_version.as_str());
        data.set("kind", cluster.kind.as_str());
        data.set("display_name", cluster.spec.display_name.as_str());
        data.set("package", cluster.spec.package.as_str());
        data.set("rest_endpoint", cluster.spec.http_endpoint.as_str());
        data.set("cloud", cluster.spec.cloud.as_str());
        data.set("resource_name", cluster.metadata.resource_name.clone());
        if let Some(environment) = &cluster.spec.environment {
            data.set_id_block("environment", &environment.id);
        }
        if let Some(region) = &cluster.spec.region {
            data.set_id_block("region", &region.id);
        }
    }

    pub async fn fetch(
        client: &ConfluentClient,
        environment_id: &str,
        id: &str,
    ) -> Result<SchemaRegistryCluster, ProviderError> {
        client
            .http
            .get(
                &client.srcm_url(&format!("clusters/{}", id)),
                &[("environment", environment_id)],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, id, e))
    }
}

#[async_trait]
impl Resource for SchemaRegistryClusterResource {
    fn type_name(&self) -> &'static str {
        "confluent_schema_registry_cluster"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "package",
                Attribute::required(AttrKind::String).describe("ESSENTIALS or ADVANCED"),
            )
            .with(
                "environment",
                Attribute::required(AttrKind::block(id_block())).force_new(),
            )
            .with(
                "region",
                Attribute::required(AttrKind::block(id_block()))
                    .force_new()
                    .describe("The Schema Registry region, e.g. sgreg-1"),
            )
            .with("api_version", Attribute::computed(AttrKind::String))
            .with("kind", Attribute::computed(AttrKind::String))
            .with("display_name", Attribute::computed(AttrKind::String))
            .with("cloud", Attribute::computed(AttrKind::String))
            .with(
                "rest_endpoint",
                Attribute::computed(AttrKind::String).describe("The HTTP endpoint of the Schema Registry cluster"),
            )
            .with("resource_name", Attribute::computed(AttrKind::String))
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["package"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["environment_id", "schema_registry_cluster_id"]
    }

    fn waits_for(&self, operation: Operation) -> bool {
        operation == Operation::Create
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: SchemaRegistryCluster = client
            .http
            .post(&client.srcm_url("clusters"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Submitted {} {:?} for provisioning", DISPLAY_NAME, created.id);
        data.set_id(&created.id);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?.to_string();
        let cluster = Self::fetch(client, &environment_id, data.id()).await?;
        Self::apply_response(data, &cluster);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        _prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?.to_string();
        let request = SchemaRegistryRequest {
            spec: SchemaRegistryRequestSpec {
                package: data.get_str("package").map(str::to_string),
                environment: Some(ObjectReference::new(&environment_id)),
                region: None,
            },
        };
        let body = request_body(DISPLAY_NAME, &request)?;

        let updated: SchemaRegistryCluster = client
            .http
            .patch(
                &client.srcm_url(&format!("clusters/{}", data.id())),
                &[("environment", environment_id.as_str())],
                &body,
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, data.id(), e))?;

        tracing::info!("Finished updating {} {:?}", DISPLAY_NAME, updated.id);
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?;
        client
            .http
            .delete(
                &client.srcm_url(&format!("clusters/{}", data.id())),
                &[("environment", environment_id)],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }

    async fn wait(
        &self,
        client: &ConfluentClient,
        _operation: Operation,
        data: &ResourceData,
    ) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?;
        let id = data.id();

        ProvisioningHandle::new(DISPLAY_NAME, id, Target::Statuses(&["PROVISIONED"]))
            .parent("environment", environment_id)
            .pending(&["PROVISIONING"])
            .failed(&["FAILED"])
            .interval(client.poll_interval(POLL_INTERVAL))
            .timeout(CREATE_TIMEOUT)
            .wait(move || async move {
                Observation::from_lookup(Self::fetch(client, environment_id, id).await, |cluster| {
                    Observation::status(cluster.status.phase)
                })
            })
            .await
            .map(|_| ())
    }

    fn import_state(&self, parts: &[&str], data: &mut ResourceData) -> Result<(), ProviderError> {
        if let [environment_id, cluster_id] = parts {
            data.set_id_block("environment", environment_id);
            data.set_id(cluster_id);
        }
        Ok(())
    }
}
