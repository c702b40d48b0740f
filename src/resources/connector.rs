//! `confluent_connector`
//!
//! Connectors are addressed by name inside a Kafka cluster. The Connect API
//! returns every connector of a cluster in one map keyed by name; the
//! connector id, its configuration and its state come from the `id`,
//! `info` and `status` expansions of that listing.
//!
//! Sensitive configuration is sent on create and update but never read
//! back: the server masks those values.

use crate::confluent::client::ConfluentClient;
use crate::error::{Operation, ProviderError};
use crate::lifecycle::{Observation, ProvisioningHandle, Target};
use crate::resource::Resource;
use crate::resources::{environment_id, redacted_request_body};
use crate::schema::{id_block, AttrKind, AttrValue, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

const DISPLAY_NAME: &str = "Connector";

const PROVISIONING: &str = "PROVISIONING";
const RUNNING: &str = "RUNNING";
const PAUSED: &str = "PAUSED";
const FAILED: &str = "FAILED";

/// Value the server substitutes for sensitive configuration
const SENSITIVE_MASK: &str = "****************";

const NAME_KEY: &str = "name";
const CONFIG_SENSITIVE: &str = "config_sensitive";
const CONFIG_NONSENSITIVE: &str = "config_nonsensitive";

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectorRequest {
    pub name: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Connector {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(rename = "type", default)]
    pub connector_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectorId {
    pub id: String,
    #[serde(default)]
    pub id_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectorState {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectorStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connector: ConnectorState,
}

/// One entry of `GET .../connectors?expand=info,status,id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectorExpansion {
    #[serde(default)]
    pub id: Option<ConnectorId>,
    #[serde(default)]
    pub info: Option<Connector>,
    #[serde(default)]
    pub status: Option<ConnectorStatus>,
}

impl ConnectorExpansion {
    fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.connector.state.as_str())
            .unwrap_or_default()
    }

    fn observation(&self) -> Observation {
        let status = self.status.as_ref().map(|s| &s.connector);
        match status {
            Some(ConnectorState {
                state,
                trace: Some(trace),
            }) if state == FAILED => Observation::failed(FAILED, trace.as_str()),
            _ => Observation::status(self.state()),
        }
    }
}

/// Where a connector lives and what it is called
#[derive(Debug, Clone, Copy)]
struct ConnectorAddress<'a> {
    environment_id: &'a str,
    cluster_id: &'a str,
    name: &'a str,
}

impl<'a> ConnectorAddress<'a> {
    fn of(data: &'a ResourceData) -> Result<Self, ProviderError> {
        let name = data
            .get(CONFIG_NONSENSITIVE)
            .and_then(|v| match v {
                AttrValue::Map(map) => map.get(NAME_KEY),
                _ => None,
            })
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ProviderError::validation(format!("{}.{} must be set", CONFIG_NONSENSITIVE, NAME_KEY))
            })?;
        let cluster_id = data
            .block_str("kafka_cluster", "id")
            .ok_or_else(|| ProviderError::validation("kafka_cluster.id must be set"))?;

        Ok(Self {
            environment_id: environment_id(data)?,
            cluster_id,
            name,
        })
    }

    fn url(&self, client: &ConfluentClient) -> String {
        client.connector_url(self.environment_id, self.cluster_id, self.name)
    }
}

pub struct ConnectorResource;

impl ConnectorResource {
    /// Sensitive and non-sensitive configuration merged into one map
    fn merged_config(data: &ResourceData) -> BTreeMap<String, String> {
        let mut config = data.get_map(CONFIG_NONSENSITIVE);
        config.extend(data.get_map(CONFIG_SENSITIVE));
        config
    }

    /// Keys whose values must never reach the log
    fn secret_keys(data: &ResourceData) -> BTreeSet<String> {
        data.get_map(CONFIG_SENSITIVE).into_keys().collect()
    }

    pub fn to_api_request(data: &ResourceData) -> ConnectorRequest {
        let config = Self::merged_config(data);
        ConnectorRequest {
            name: config.get(NAME_KEY).cloned().unwrap_or_default(),
            config,
        }
    }

    /// Map the lookup result into state. `config_sensitive` is left as it
    /// is; keys it holds and masked values stay out of
    /// `config_nonsensitive`.
    ///
    /// Once `config_nonsensitive` tracks declared settings, only those keys
    /// are read back, so keys the server adds on its own (`kafka.endpoint`)
    /// do not show up as changes. A state tracking nothing but the name
    /// (an import) takes every key the server reports.
    pub fn apply_response(data: &mut ResourceData, connector: &ConnectorExpansion) {
        if let Some(id) = &connector.id {
            data.set_id(&id.id);
        }
        data.set("status", connector.state());

        if let Some(info) = &connector.info {
            let sensitive = data.get_map(CONFIG_SENSITIVE);
            let tracked = data.get_map(CONFIG_NONSENSITIVE);
            let declared_only = tracked.keys().any(|key| key != NAME_KEY);
            let nonsensitive: BTreeMap<String, String> = info
                .config
                .iter()
                .filter(|(key, value)| !sensitive.contains_key(*key) && value.as_str() != SENSITIVE_MASK)
                .filter(|(key, _)| !declared_only || *key == NAME_KEY || tracked.contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            data.set(CONFIG_NONSENSITIVE, nonsensitive);
        }
    }

    /// Find a connector by name
    async fn lookup(
        client: &ConfluentClient,
        address: ConnectorAddress<'_>,
    ) -> Result<ConnectorExpansion, ProviderError> {
        let mut connectors: HashMap<String, ConnectorExpansion> = client
            .http
            .get(
                &client.connectors_url(address.environment_id, address.cluster_id),
                &[("expand", "info,status,id")],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, address.name, e))?;

        connectors
            .remove(address.name)
            .ok_or_else(|| ProviderError::NotFound {
                resource_type: DISPLAY_NAME.to_string(),
                id: address.name.to_string(),
            })
    }

    fn desired_status(data: &ResourceData) -> Result<&'static str, ProviderError> {
        match data.get_str("status") {
            None | Some(RUNNING) => Ok(RUNNING),
            Some(PAUSED) => Ok(PAUSED),
            Some(other) => Err(ProviderError::validation(format!(
                "\"status\" must be {} or {}, got {:?}",
                RUNNING, PAUSED, other
            ))),
        }
    }

    async fn set_paused(
        client: &ConfluentClient,
        address: ConnectorAddress<'_>,
        paused: bool,
    ) -> Result<(), ProviderError> {
        let action = if paused { "pause" } else { "resume" };
        tracing::info!("Requesting {} of {} {:?}", action, DISPLAY_NAME, address.name);
        client
            .http
            .put_empty(&format!("{}/{}", address.url(client), action))
            .await
            .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, address.name, e))
    }

    async fn wait_for_status(
        client: &ConfluentClient,
        address: ConnectorAddress<'_>,
        target: &'static str,
    ) -> Result<(), ProviderError> {
        let handle = if target == PAUSED {
            ProvisioningHandle::new(DISPLAY_NAME, address.name, Target::Statuses(&[PAUSED]))
                .pending(&[PROVISIONING, RUNNING])
        } else {
            ProvisioningHandle::new(DISPLAY_NAME, address.name, Target::Statuses(&[RUNNING]))
                .pending(&[PROVISIONING, PAUSED])
        };

        handle
            .parent("environment", address.environment_id)
            .parent("kafka_cluster", address.cluster_id)
            .failed(&[FAILED])
            .interval(client.poll_interval(POLL_INTERVAL))
            .timeout(TIMEOUT)
            .wait(move || async move {
                Observation::from_lookup(Self::lookup(client, address).await, |connector| {
                    connector.observation()
                })
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Resource for ConnectorResource {
    fn type_name(&self) -> &'static str {
        "confluent_connector"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "environment",
                Attribute::required(AttrKind::block(id_block())).force_new(),
            )
            .with(
                "kafka_cluster",
                Attribute::required(AttrKind::block(id_block())).force_new(),
            )
            .with(
                CONFIG_SENSITIVE,
                Attribute::optional(AttrKind::StringMap)
                    .sensitive()
                    .describe("Sensitive configuration settings; never read back"),
            )
            .with(
                CONFIG_NONSENSITIVE,
                Attribute::required(AttrKind::StringMap)
                    .describe("Non-sensitive configuration settings, including the connector name"),
            )
            .with(
                "status",
                Attribute::optional_computed(AttrKind::String).describe("RUNNING or PAUSED"),
            )
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &[CONFIG_SENSITIVE, CONFIG_NONSENSITIVE, "status"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["environment_id", "kafka_cluster_id", "connector_name"]
    }

    fn waits_for(&self, operation: Operation) -> bool {
        matches!(operation, Operation::Create | Operation::Update)
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        Self::desired_status(data)?;
        let address = ConnectorAddress::of(data)?;
        let body = redacted_request_body(DISPLAY_NAME, &Self::to_api_request(data), &Self::secret_keys(data))?;

        let created: Connector = client
            .http
            .post(
                &client.connectors_url(address.environment_id, address.cluster_id),
                &body,
            )
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, address.name, e))?;

        tracing::info!("Submitted {} {:?} for provisioning", DISPLAY_NAME, created.name);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let connector = Self::lookup(client, ConnectorAddress::of(data)?).await?;
        Self::apply_response(data, &connector);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let address = ConnectorAddress::of(data)?;
        let prior_address = ConnectorAddress::of(prior)?;
        if address.name != prior_address.name {
            return Err(ProviderError::validation(format!(
                "error updating {} {:?}: {}.{} cannot be updated in place, the resource must be replaced",
                DISPLAY_NAME,
                prior_address.name,
                CONFIG_NONSENSITIVE,
                NAME_KEY
            )));
        }
        let desired = Self::desired_status(data)?;

        if Self::merged_config(data) != Self::merged_config(prior) {
            let body = redacted_request_body(DISPLAY_NAME, &Self::merged_config(data), &Self::secret_keys(data))?;
            let updated: Connector = client
                .http
                .put(&format!("{}/config", address.url(client)), &body)
                .await
                .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, address.name, e))?;
            tracing::info!("Finished updating {} {:?} config", DISPLAY_NAME, updated.name);
        }

        let current = prior.get_str("status").unwrap_or(RUNNING);
        if desired != current {
            Self::set_paused(client, address, desired == PAUSED).await?;
        }
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        let address = ConnectorAddress::of(data)?;
        client
            .http
            .delete(&address.url(client), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, address.name, e))
    }

    async fn wait(
        &self,
        client: &ConfluentClient,
        operation: Operation,
        data: &ResourceData,
    ) -> Result<(), ProviderError> {
        let address = ConnectorAddress::of(data)?;
        let desired = Self::desired_status(data)?;

        if operation == Operation::Create {
            Self::wait_for_status(client, address, RUNNING).await?;
            if desired == PAUSED {
                Self::set_paused(client, address, true).await?;
            } else {
                return Ok(());
            }
        }
        Self::wait_for_status(client, address, desired).await
    }

    fn import_state(&self, parts: &[&str], data: &mut ResourceData) -> Result<(), ProviderError> {
        if let [environment_id, cluster_id, name] = parts {
            data.set_id_block("environment", environment_id);
            data.set_id_block("kafka_cluster", cluster_id);
            let mut config = BTreeMap::new();
            config.insert(NAME_KEY.to_string(), name.to_string());
            data.set(CONFIG_NONSENSITIVE, config);
        }
        Ok(())
    }
}
