//! `confluent_kafka_cluster`
//!
//! Clusters provision asynchronously. Create waits for `PROVISIONED`,
//! resizing a Dedicated cluster waits until the reported CKU count matches
//! the requested one, and delete waits until the cluster is gone.

use crate::confluent::client::ConfluentClient;
use crate::confluent::models::{ObjectMeta, ObjectReference};
use crate::error::{Operation, ProviderError};
use crate::lifecycle::{Observation, ProvisioningHandle, Target};
use crate::resource::Resource;
use crate::resources::{debug_json, environment_id, request_body};
use crate::schema::{id_block, AttrKind, AttrValue, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const DISPLAY_NAME: &str = "Kafka Cluster";

const PROVISIONING: &str = "PROVISIONING";
const PROVISIONED: &str = "PROVISIONED";
const FAILED: &str = "FAILED";
/// Reported while a Dedicated cluster is `PROVISIONED` but its CKU count
/// has not caught up with the request yet
const RESIZING: &str = "RESIZING";

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEDICATED_POLL_INTERVAL: Duration = Duration::from_secs(60);
const CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DEDICATED_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

const SINGLE_ZONE: &str = "SINGLE_ZONE";
const MULTI_ZONE: &str = "MULTI_ZONE";

const CLUSTER_TYPES: &[&str] = &["basic", "standard", "enterprise", "dedicated"];

/// Cluster type, tagged on `kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClusterConfig {
    Basic,
    Standard,
    Enterprise,
    Dedicated {
        cku: i64,
    },
    #[serde(other)]
    Unknown,
}

impl ClusterConfig {
    /// Name of the configuration block for this type
    pub fn block_name(&self) -> Option<&'static str> {
        match self {
            Self::Basic => Some("basic"),
            Self::Standard => Some("standard"),
            Self::Enterprise => Some("enterprise"),
            Self::Dedicated { .. } => Some("dedicated"),
            Self::Unknown => None,
        }
    }

    fn from_declared(data: &ResourceData) -> Option<Self> {
        if data.has_block("basic") {
            Some(Self::Basic)
        } else if data.has_block("standard") {
            Some(Self::Standard)
        } else if data.has_block("enterprise") {
            Some(Self::Enterprise)
        } else if data.has_block("dedicated") {
            Some(Self::Dedicated {
                cku: data.block_int("dedicated", "cku").unwrap_or_default(),
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterRequestSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ClusterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectReference>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterRequest {
    pub spec: ClusterRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub config: Option<ClusterConfig>,
    #[serde(default)]
    pub environment: Option<ObjectReference>,
    #[serde(default)]
    pub kafka_bootstrap_endpoint: Option<String>,
    #[serde(default)]
    pub http_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub cku: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaCluster {
    pub id: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

impl KafkaCluster {
    /// Provisioning status as seen by the poller
    fn observation(&self) -> Observation {
        if self.status.phase == PROVISIONED {
            if let Some(ClusterConfig::Dedicated { cku }) = &self.spec.config {
                if self.status.cku.is_some_and(|actual| actual != *cku) {
                    return Observation::status(RESIZING);
                }
            }
        }
        Observation::status(self.status.phase.as_str())
    }
}

pub struct KafkaClusterResource;

impl KafkaClusterResource {
    pub fn to_api_request(data: &ResourceData) -> ClusterRequest {
        ClusterRequest {
            spec: ClusterRequestSpec {
                display_name: data.get_str("display_name").map(str::to_string),
                availability: data.get_str("availability").map(str::to_string),
                cloud: data.get_str("cloud").map(str::to_string),
                region: data.get_str("region").map(str::to_string),
                config: ClusterConfig::from_declared(data),
                environment: data
                    .block_str("environment", "id")
                    .map(ObjectReference::new),
            },
        }
    }

    pub fn apply_response(data: &mut ResourceData, cluster: &KafkaCluster) {
        data.set_id(&cluster.id);
        data.set("api_version", cluster.api_version.as_str());
        data.set("kind", cluster.kind.as_str());
        data.set("display_name", cluster.spec.display_name.as_str());
        data.set("availability", cluster.spec.availability.as_str());
        data.set("cloud", cluster.spec.cloud.as_str());
        data.set("region", cluster.spec.region.as_str());
        data.set("bootstrap_endpoint", cluster.spec.kafka_bootstrap_endpoint.clone());
        data.set("rest_endpoint", cluster.spec.http_endpoint.clone());
        data.set("rbac_crn", cluster.metadata.resource_name.clone());
        if let Some(environment) = &cluster.spec.environment {
            data.set_id_block("environment", &environment.id);
        }

        let populated = cluster.spec.config.as_ref().and_then(ClusterConfig::block_name);
        for block in CLUSTER_TYPES {
            if Some(*block) != populated {
                data.clear_block(block);
            }
        }
        match &cluster.spec.config {
            Some(ClusterConfig::Dedicated { cku }) => {
                let mut fields = BTreeMap::new();
                fields.insert("cku".to_string(), AttrValue::Int(*cku));
                data.set_block("dedicated", fields);
            }
            Some(config) => {
                if let Some(block) = config.block_name() {
                    data.set_block(block, BTreeMap::new());
                }
            }
            None => {}
        }
    }

    pub async fn fetch(
        client: &ConfluentClient,
        environment_id: &str,
        id: &str,
    ) -> Result<KafkaCluster, ProviderError> {
        client
            .http
            .get(
                &client.cmk_url(&format!("clusters/{}", id)),
                &[("environment", environment_id)],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, id, e))
    }

    /// Check a requested type or size change before anything is sent.
    ///
    /// Basic can be upgraded to Standard; a Dedicated cluster can change its
    /// CKU count (at least 2 when multi-zone). Everything else needs a new
    /// cluster.
    fn check_config_change(
        prior: &ResourceData,
        data: &ResourceData,
    ) -> Result<Option<ClusterConfig>, ProviderError> {
        let old = ClusterConfig::from_declared(prior);
        let new = ClusterConfig::from_declared(data);

        match (old, new) {
            (old, new) if old == new => Ok(None),
            (Some(ClusterConfig::Basic), Some(ClusterConfig::Standard)) => Ok(Some(ClusterConfig::Standard)),
            (Some(ClusterConfig::Dedicated { .. }), Some(ClusterConfig::Dedicated { cku })) => {
                let min = if data.get_str("availability") == Some(MULTI_ZONE) {
                    2
                } else {
                    1
                };
                if cku < min {
                    return Err(ProviderError::validation(format!(
                        "error updating {} {:?}: \"cku\" must be at least {} for {} clusters, got {}",
                        DISPLAY_NAME,
                        data.id(),
                        min,
                        data.get_str("availability").unwrap_or(SINGLE_ZONE),
                        cku
                    )));
                }
                Ok(Some(ClusterConfig::Dedicated { cku }))
            }
            (old, new) => Err(ProviderError::validation(format!(
                "error updating {} {:?}: changing the cluster type from {} to {} is not supported, only basic to standard upgrades and dedicated CKU changes are",
                DISPLAY_NAME,
                data.id(),
                old.as_ref().and_then(ClusterConfig::block_name).unwrap_or("none"),
                new.as_ref().and_then(ClusterConfig::block_name).unwrap_or("none"),
            ))),
        }
    }

    fn timeout_for(data: &ResourceData) -> Duration {
        if data.has_block("dedicated") {
            DEDICATED_TIMEOUT
        } else {
            CREATE_TIMEOUT
        }
    }

    fn interval_for(client: &ConfluentClient, data: &ResourceData) -> Duration {
        if data.has_block("dedicated") {
            client.poll_interval(DEDICATED_POLL_INTERVAL)
        } else {
            client.poll_interval(POLL_INTERVAL)
        }
    }
}

fn dedicated_schema() -> Schema {
    Schema::new().with(
        "cku",
        Attribute::required(AttrKind::Int).describe("Number of Confluent Kafka Units"),
    )
}

#[async_trait]
impl Resource for KafkaClusterResource {
    fn type_name(&self) -> &'static str {
        "confluent_kafka_cluster"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "display_name",
                Attribute::required(AttrKind::String).describe("The name of the Kafka cluster"),
            )
            .with(
                "availability",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("SINGLE_ZONE or MULTI_ZONE"),
            )
            .with(
                "cloud",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("AWS, AZURE or GCP"),
            )
            .with("region", Attribute::required(AttrKind::String).force_new())
            .with(
                "basic",
                Attribute::optional(AttrKind::block(Schema::new())).exactly_one_of(CLUSTER_TYPES),
            )
            .with(
                "standard",
                Attribute::optional(AttrKind::block(Schema::new())).exactly_one_of(CLUSTER_TYPES),
            )
            .with(
                "enterprise",
                Attribute::optional(AttrKind::block(Schema::new())).exactly_one_of(CLUSTER_TYPES),
            )
            .with(
                "dedicated",
                Attribute::optional(AttrKind::block(dedicated_schema())).exactly_one_of(CLUSTER_TYPES),
            )
            .with(
                "environment",
                Attribute::required(AttrKind::block(id_block())).force_new(),
            )
            .with("api_version", Attribute::computed(AttrKind::String))
            .with("kind", Attribute::computed(AttrKind::String))
            .with(
                "bootstrap_endpoint",
                Attribute::computed(AttrKind::String).describe("The bootstrap endpoint used by Kafka clients"),
            )
            .with(
                "rest_endpoint",
                Attribute::computed(AttrKind::String).describe("The REST endpoint of the Kafka cluster"),
            )
            .with(
                "rbac_crn",
                Attribute::computed(AttrKind::String).describe("The Confluent Resource Name used in role bindings"),
            )
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["display_name", "basic", "standard", "enterprise", "dedicated"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["environment_id", "kafka_cluster_id"]
    }

    fn waits_for(&self, operation: Operation) -> bool {
        matches!(operation, Operation::Create | Operation::Update | Operation::Delete)
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: KafkaCluster = client
            .http
            .post(&client.cmk_url("clusters"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        debug_json("Created Kafka Cluster", &created);
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
        prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let config = Self::check_config_change(prior, data)?;
        let display_name = data
            .get_str("display_name")
            .filter(|name| Some(*name) != prior.get_str("display_name"))
            .map(str::to_string);

        if config.is_none() && display_name.is_none() {
            return Ok(());
        }

        let environment_id = environment_id(data)?.to_string();
        let request = ClusterRequest {
            spec: ClusterRequestSpec {
                display_name,
                config,
                environment: Some(ObjectReference::new(&environment_id)),
                ..Default::default()
            },
        };
        let body = request_body(DISPLAY_NAME, &request)?;

        let updated: KafkaCluster = client
            .http
            .patch(
                &client.cmk_url(&format!("clusters/{}", data.id())),
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
                &client.cmk_url(&format!("clusters/{}", data.id())),
                &[("environment", environment_id)],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }

    async fn wait(
        &self,
        client: &ConfluentClient,
        operation: Operation,
        data: &ResourceData,
    ) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?;
        let id = data.id();

        let handle = match operation {
            Operation::Delete => ProvisioningHandle::new(DISPLAY_NAME, id, Target::Gone)
                .pending(&[PROVISIONED, PROVISIONING, "DEPROVISIONING"])
                .failed(&[FAILED]),
            Operation::Update if !data.has_block("dedicated") => return Ok(()),
            _ => ProvisioningHandle::new(DISPLAY_NAME, id, Target::Statuses(&[PROVISIONED]))
                .pending(&[PROVISIONING, RESIZING])
                .failed(&[FAILED]),
        };

        handle
            .parent("environment", environment_id)
            .interval(Self::interval_for(client, data))
            .timeout(Self::timeout_for(data))
            .wait(move || async move {
                Observation::from_lookup(Self::fetch(client, environment_id, id).await, |cluster| {
                    cluster.observation()
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declared(config: serde_json::Value) -> ResourceData {
        ResourceData::from_json(&KafkaClusterResource.schema(), &config).unwrap()
    }

    fn dedicated(cku: i64, availability: &str) -> ResourceData {
        declared(json!({
            "display_name": "inventory",
            "availability": availability,
            "cloud": "AWS",
            "region": "us-east-2",
            "dedicated": {"cku": cku},
            "environment": {"id": "env-1"}
        }))
    }

    #[test]
    fn test_request_carries_tagged_config() {
        let data = declared(json!({
            "display_name": "inventory",
            "availability": "SINGLE_ZONE",
            "cloud": "GCP",
            "region": "us-central1",
            "basic": {},
            "environment": {"id": "env-1"}
        }));
        KafkaClusterResource.schema().validate(data.attributes()).unwrap();

        let request = KafkaClusterResource::to_api_request(&data);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"spec": {
                "display_name": "inventory",
                "availability": "SINGLE_ZONE",
                "cloud": "GCP",
                "region": "us-central1",
                "config": {"kind": "Basic"},
                "environment": {"id": "env-1"}
            }})
        );
    }

    #[test]
    fn test_two_cluster_types_rejected() {
        let data = declared(json!({
            "display_name": "inventory",
            "availability": "SINGLE_ZONE",
            "cloud": "GCP",
            "region": "us-central1",
            "basic": {},
            "standard": {},
            "environment": {"id": "env-1"}
        }));
        let err = KafkaClusterResource.schema().validate(data.attributes()).unwrap_err();
        assert!(err.to_string().contains("exactly one of"));
    }

    #[test]
    fn test_apply_response_populates_single_type_block() {
        let cluster: KafkaCluster = serde_json::from_value(json!({
            "api_version": "cmk/v2",
            "kind": "Cluster",
            "id": "lkc-abc",
            "spec": {
                "display_name": "inventory",
                "availability": "MULTI_ZONE",
                "cloud": "AWS",
                "region": "us-east-2",
                "config": {"kind": "Dedicated", "cku": 2},
                "environment": {"id": "env-1", "related": "https://api.confluent.cloud/v2/environments/env-1"},
                "kafka_bootstrap_endpoint": "SASL_SSL://pkc-00000.us-east-2.aws.confluent.cloud:9092",
                "http_endpoint": "https://pkc-00000.us-east-2.aws.confluent.cloud:443"
            },
            "status": {"phase": "PROVISIONED", "cku": 2},
            "metadata": {"resource_name": "crn://confluent.cloud/organization=o-1/environment=env-1/cloud-cluster=lkc-abc"}
        }))
        .unwrap();

        let mut data = ResourceData::new();
        data.set_block("basic", BTreeMap::new());
        KafkaClusterResource::apply_response(&mut data, &cluster);

        assert_eq!(data.id(), "lkc-abc");
        assert_eq!(data.block_int("dedicated", "cku"), Some(2));
        assert!(!data.has_block("basic"));
        assert!(!data.has_block("standard"));
        assert_eq!(data.block_str("environment", "id"), Some("env-1"));
        assert_eq!(
            data.get_str("bootstrap_endpoint"),
            Some("SASL_SSL://pkc-00000.us-east-2.aws.confluent.cloud:9092")
        );
        assert!(data.get_str("rbac_crn").unwrap().ends_with("cloud-cluster=lkc-abc"));
    }

    #[test]
    fn test_unknown_cluster_kind_decodes() {
        let config: ClusterConfig = serde_json::from_value(json!({"kind": "Freight"})).unwrap();
        assert_eq!(config, ClusterConfig::Unknown);
        assert_eq!(config.block_name(), None);
    }

    #[test]
    fn test_resizing_until_cku_matches() {
        let mut cluster = KafkaCluster {
            id: "lkc-abc".to_string(),
            spec: ClusterSpec {
                config: Some(ClusterConfig::Dedicated { cku: 3 }),
                ..Default::default()
            },
            status: ClusterStatus {
                phase: PROVISIONED.to_string(),
                cku: Some(2),
            },
            ..Default::default()
        };
        assert_eq!(cluster.observation(), Observation::status(RESIZING));

        cluster.status.cku = Some(3);
        assert_eq!(cluster.observation(), Observation::status(PROVISIONED));
    }

    #[test]
    fn test_basic_to_standard_upgrade_allowed() {
        let mut prior = ResourceData::new();
        prior.set_block("basic", BTreeMap::new());
        let mut data = ResourceData::new();
        data.set_block("standard", BTreeMap::new());

        let change = KafkaClusterResource::check_config_change(&prior, &data).unwrap();
        assert_eq!(change, Some(ClusterConfig::Standard));
    }

    #[test]
    fn test_downgrade_rejected() {
        let mut prior = ResourceData::new();
        prior.set_block("standard", BTreeMap::new());
        let mut data = ResourceData::new();
        data.set_block("basic", BTreeMap::new());

        let err = KafkaClusterResource::check_config_change(&prior, &data).unwrap_err();
        assert!(err.to_string().contains("from standard to basic"));
    }

    #[test]
    fn test_multi_zone_cku_minimum() {
        let prior = dedicated(2, MULTI_ZONE);
        let err = KafkaClusterResource::check_config_change(&prior, &dedicated(1, MULTI_ZONE)).unwrap_err();
        assert!(err.to_string().contains("at least 2"));

        let change = KafkaClusterResource::check_config_change(&prior, &dedicated(4, MULTI_ZONE)).unwrap();
        assert_eq!(change, Some(ClusterConfig::Dedicated { cku: 4 }));
    }

    #[test]
    fn test_import_sets_environment_and_id() {
        let mut data = ResourceData::new();
        KafkaClusterResource
            .import_state(&["env-1", "lkc-abc"], &mut data)
            .unwrap();
        assert_eq!(data.id(), "lkc-abc");
        assert_eq!(data.block_str("environment", "id"), Some("env-1"));
    }
}
