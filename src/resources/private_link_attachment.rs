//! `confluent_private_link_attachment`
//!
//! The cloud-specific half of the status is a tagged union; exactly one of
//! the `aws`, `azure` and `gcp` blocks is populated from it.

use crate::confluent::client::ConfluentClient;
use crate::confluent::models::{ObjectMeta, ObjectReference};
use crate::error::{Operation, ProviderError};
use crate::lifecycle::{Observation, ProvisioningHandle, Target};
use crate::resource::Resource;
use crate::resources::{environment_id, request_body};
use crate::schema::{id_block, AttrKind, AttrValue, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const DISPLAY_NAME: &str = "Private Link Attachment";

const PROVISIONING: &str = "PROVISIONING";
const WAITING_FOR_CONNECTIONS: &str = "WAITING_FOR_CONNECTIONS";
const READY: &str = "READY";
const FAILED: &str = "FAILED";
const EXPIRED: &str = "EXPIRED";

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const TIMEOUT: Duration = Duration::from_secs(60 * 60);

const CLOUD_BLOCKS: &[&str] = &["aws", "azure", "gcp"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentRequestSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentRequest {
    pub spec: AttachmentRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachmentSpec {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub environment: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AwsVpcEndpointService {
    #[serde(default)]
    pub vpc_endpoint_service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AzurePrivateLinkService {
    #[serde(default)]
    pub private_link_service_alias: String,
    #[serde(default)]
    pub private_link_service_resource_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GcpServiceAttachment {
    #[serde(default)]
    pub private_service_connect_service_attachment: String,
}

/// Cloud-specific status, tagged on `kind`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind")]
pub enum AttachmentCloudStatus {
    #[serde(rename = "AwsPrivateLinkAttachmentStatus")]
    Aws {
        #[serde(default)]
        vpc_endpoint_service: AwsVpcEndpointService,
    },
    #[serde(rename = "AzurePrivateLinkAttachmentStatus")]
    Azure {
        #[serde(default)]
        private_link_service: AzurePrivateLinkService,
    },
    #[serde(rename = "GcpPrivateLinkAttachmentStatus")]
    Gcp {
        #[serde(default)]
        service_attachment: GcpServiceAttachment,
    },
}

impl AttachmentCloudStatus {
    /// Block name and fields of the populated cloud block
    fn to_block(&self) -> (&'static str, BTreeMap<String, AttrValue>) {
        let mut fields = BTreeMap::new();
        let name = match self {
            Self::Aws { vpc_endpoint_service } => {
                fields.insert(
                    "vpc_endpoint_service_name".to_string(),
                    AttrValue::from(vpc_endpoint_service.vpc_endpoint_service_name.as_str()),
                );
                "aws"
            }
            Self::Azure { private_link_service } => {
                fields.insert(
                    "private_link_service_alias".to_string(),
                    AttrValue::from(private_link_service.private_link_service_alias.as_str()),
                );
                fields.insert(
                    "private_link_service_resource_id".to_string(),
                    AttrValue::from(private_link_service.private_link_service_resource_id.as_str()),
                );
                "azure"
            }
            Self::Gcp { service_attachment } => {
                fields.insert(
                    "private_service_connect_service_attachment".to_string(),
                    AttrValue::from(service_attachment.private_service_connect_service_attachment.as_str()),
                );
                "gcp"
            }
        };
        (name, fields)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachmentStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub cloud: Option<AttachmentCloudStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PrivateLinkAttachment {
    pub id: String,
    #[serde(default)]
    pub spec: AttachmentSpec,
    #[serde(default)]
    pub status: AttachmentStatus,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

impl PrivateLinkAttachment {
    fn observation(&self) -> Observation {
        match &self.status.error_message {
            Some(message) if self.status.phase == FAILED => Observation::failed(FAILED, message.as_str()),
            _ => Observation::status(self.status.phase.as_str()),
        }
    }
}

pub struct PrivateLinkAttachmentResource;

impl PrivateLinkAttachmentResource {
    pub fn to_api_request(data: &ResourceData) -> AttachmentRequest {
        AttachmentRequest {
            spec: AttachmentRequestSpec {
                display_name: data.get_str("display_name").map(str::to_string),
                cloud: data.get_str("cloud").map(str::to_string),
                region: data.get_str("region").map(str::to_string),
                environment: data.block_str("environment", "id").map(ObjectReference::new),
            },
        }
    }

    pub fn apply_response(data: &mut ResourceData, attachment: &PrivateLinkAttachment) {
        data.set_id(&attachment.id);
        data.set("display_name", attachment.spec.display_name.as_str());
        data.set("cloud", attachment.spec.cloud.as_str());
        data.set("region", attachment.spec.region.as_str());
        data.set("resource_name", attachment.metadata.resource_name.clone());
        if let Some(environment) = &attachment.spec.environment {
            data.set_id_block("environment", &environment.id);
        }

        for block in CLOUD_BLOCKS {
            data.clear_block(block);
        }
        if let Some(cloud) = &attachment.status.cloud {
            let (name, fields) = cloud.to_block();
            data.set_block(name, fields);
        }
    }

    pub async fn fetch(
        client: &ConfluentClient,
        environment_id: &str,
        id: &str,
    ) -> Result<PrivateLinkAttachment, ProviderError> {
        client
            .http
            .get(
                &client.networking_url(&format!("private-link-attachments/{}", id)),
                &[("environment", environment_id)],
            )
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, id, e))
    }
}

fn aws_schema() -> Schema {
    Schema::new().with(
        "vpc_endpoint_service_name",
        Attribute::computed(AttrKind::String).describe("AWS VPC Endpoint Service name to connect to"),
    )
}

fn azure_schema() -> Schema {
    Schema::new()
        .with("private_link_service_alias", Attribute::computed(AttrKind::String))
        .with("private_link_service_resource_id", Attribute::computed(AttrKind::String))
}

fn gcp_schema() -> Schema {
    Schema::new().with(
        "private_service_connect_service_attachment",
        Attribute::computed(AttrKind::String),
    )
}

#[async_trait]
impl Resource for PrivateLinkAttachmentResource {
    fn type_name(&self) -> &'static str {
        "confluent_private_link_attachment"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with("display_name", Attribute::optional_computed(AttrKind::String))
            .with(
                "cloud",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("AWS, AZURE or GCP"),
            )
            .with("region", Attribute::required(AttrKind::String).force_new())
            .with(
                "environment",
                Attribute::required(AttrKind::block(id_block())).force_new(),
            )
            .with("aws", Attribute::computed(AttrKind::block(aws_schema())))
            .with("azure", Attribute::computed(AttrKind::block(azure_schema())))
            .with("gcp", Attribute::computed(AttrKind::block(gcp_schema())))
            .with("resource_name", Attribute::computed(AttrKind::String))
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["display_name"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["environment_id", "private_link_attachment_id"]
    }

    fn waits_for(&self, operation: Operation) -> bool {
        matches!(operation, Operation::Create | Operation::Delete)
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: PrivateLinkAttachment = client
            .http
            .post(&client.networking_url("private-link-attachments"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Submitted {} {:?} for provisioning", DISPLAY_NAME, created.id);
        data.set_id(&created.id);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?.to_string();
        let attachment = Self::fetch(client, &environment_id, data.id()).await?;
        Self::apply_response(data, &attachment);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        _prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let environment_id = environment_id(data)?.to_string();
        let request = AttachmentRequest {
            spec: AttachmentRequestSpec {
                display_name: data.get_str("display_name").map(str::to_string),
                environment: Some(ObjectReference::new(&environment_id)),
                ..Default::default()
            },
        };
        let body = request_body(DISPLAY_NAME, &request)?;

        let updated: PrivateLinkAttachment = client
            .http
            .patch(
                &client.networking_url(&format!("private-link-attachments/{}", data.id())),
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
                &client.networking_url(&format!("private-link-attachments/{}", data.id())),
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

        let handle = if operation == Operation::Delete {
            ProvisioningHandle::new(DISPLAY_NAME, id, Target::Gone)
                .pending(&[PROVISIONING, WAITING_FOR_CONNECTIONS, READY, "DEPROVISIONING"])
                .failed(&[FAILED])
        } else {
            ProvisioningHandle::new(DISPLAY_NAME, id, Target::Statuses(&[WAITING_FOR_CONNECTIONS, READY]))
                .pending(&[PROVISIONING])
                .failed(&[FAILED, EXPIRED])
        };

        handle
            .parent("environment", environment_id)
            .interval(client.poll_interval(POLL_INTERVAL))
            .timeout(TIMEOUT)
            .wait(move || async move {
                Observation::from_lookup(Self::fetch(client, environment_id, id).await, |attachment| {
                    attachment.observation()
                })
            })
            .await
            .map(|_| ())
    }

    fn import_state(&self, parts: &[&str], data: &mut ResourceData) -> Result<(), ProviderError> {
        if let [environment_id, attachment_id] = parts {
            data.set_id_block("environment", environment_id);
            data.set_id(attachment_id);
        }
        Ok(())
    }
}
