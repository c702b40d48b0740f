//! `confluent_api_key`
//!
//! The secret is only returned by the create call. Reads keep whatever
//! secret is already in state; imports take it from `API_KEY_SECRET`.

use crate::config::{non_empty_env, ENV_IMPORT_API_KEY_SECRET};
use crate::confluent::client::ConfluentClient;
use crate::confluent::models::ObjectReference;
use crate::error::{Operation, ProviderError};
use crate::resource::Resource;
use crate::resources::request_body;
use crate::schema::{id_block, AttrKind, AttrValue, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DISPLAY_NAME: &str = "API Key";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiKeyRequestSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiKeyRequest {
    pub spec: ApiKeyRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiKeySpec {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: Option<ObjectReference>,
    #[serde(default)]
    pub resource: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiKey {
    pub id: String,
    #[serde(default)]
    pub spec: ApiKeySpec,
}

pub struct ApiKeyResource;

impl ApiKeyResource {
    fn reference(data: &ResourceData, block: &str) -> Option<ObjectReference> {
        let id = data.block_str(block, "id")?;
        Some(ObjectReference {
            id: id.to_string(),
            api_version: data.block_str(block, "api_version").map(str::to_string),
            kind: data.block_str(block, "kind").map(str::to_string),
            environment: data
                .block(block)
                .and_then(|b| b.get("environment"))
                .and_then(AttrValue::as_block)
                .and_then(|env| env.get("id"))
                .and_then(AttrValue::as_str)
                .map(str::to_string),
            ..Default::default()
        })
    }

    fn reference_block(reference: &ObjectReference, with_environment: bool) -> BTreeMap<String, AttrValue> {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), AttrValue::from(reference.id.as_str()));
        fields.insert("api_version".to_string(), AttrValue::from(reference.api_version.clone()));
        fields.insert("kind".to_string(), AttrValue::from(reference.kind.clone()));
        if with_environment {
            if let Some(environment) = &reference.environment {
                let mut env = BTreeMap::new();
                env.insert("id".to_string(), AttrValue::from(environment.as_str()));
                fields.insert(
                    "environment".to_string(),
                    AttrValue::List(vec![AttrValue::Object(env)]),
                );
            }
        }
        fields
    }

    pub fn to_api_request(data: &ResourceData) -> ApiKeyRequest {
        ApiKeyRequest {
            spec: ApiKeyRequestSpec {
                display_name: data.get_str("display_name").map(str::to_string),
                description: data.get_str("description").map(str::to_string),
                owner: Self::reference(data, "owner"),
                resource: Self::reference(data, "managed_resource"),
            },
        }
    }

    /// Map a response into state. A secret in the response replaces the
    /// stored one; its absence leaves the stored one alone.
    pub fn apply_response(data: &mut ResourceData, key: &ApiKey) {
        data.set_id(&key.id);
        data.set("display_name", key.spec.display_name.as_str());
        data.set("description", key.spec.description.as_str());
        if let Some(secret) = key.spec.secret.as_deref().filter(|s| !s.is_empty()) {
            data.set("secret", secret);
        }
        match &key.spec.owner {
            Some(owner) => data.set_block("owner", Self::reference_block(owner, false)),
            None => data.clear_block("owner"),
        }
        match &key.spec.resource {
            Some(resource) => data.set_block("managed_resource", Self::reference_block(resource, true)),
            None => data.clear_block("managed_resource"),
        }
    }

    /// Seed an imported key; `secret` is required because the API never
    /// returns it again.
    fn import_with_secret(
        parts: &[&str],
        secret: Option<String>,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let secret = secret.ok_or_else(|| {
            ProviderError::validation(format!(
                "error importing {}: {} environment variable is empty but it must be set",
                DISPLAY_NAME, ENV_IMPORT_API_KEY_SECRET
            ))
        })?;
        if let [id] = parts {
            data.set_id(id);
        }
        data.set("secret", secret);
        Ok(())
    }
}

fn reference_schema() -> Schema {
    Schema::new()
        .with("id", Attribute::required(AttrKind::String))
        .with("api_version", Attribute::required(AttrKind::String))
        .with("kind", Attribute::required(AttrKind::String))
}

fn managed_resource_schema() -> Schema {
    reference_schema().with("environment", Attribute::required(AttrKind::block(id_block())))
}

#[async_trait]
impl Resource for ApiKeyResource {
    fn type_name(&self) -> &'static str {
        "confluent_api_key"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with("display_name", Attribute::optional(AttrKind::String))
            .with("description", Attribute::optional(AttrKind::String))
            .with(
                "owner",
                Attribute::required(AttrKind::block(reference_schema()))
                    .force_new()
                    .describe("The owner to which the API Key belongs"),
            )
            .with(
                "managed_resource",
                Attribute::optional(AttrKind::block(managed_resource_schema()))
                    .force_new()
                    .describe("The resource associated with this API Key; omit for a Cloud API Key"),
            )
            .with(
                "secret",
                Attribute::computed(AttrKind::String)
                    .sensitive()
                    .describe("The secret of the API Key"),
            )
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["display_name", "description"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["api_key_id"]
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: ApiKey = client
            .http
            .post(&client.iam_url("api-keys"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Finished creating {} {:?}", DISPLAY_NAME, created.id);
        Self::apply_response(data, &created);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let key: ApiKey = client
            .http
            .get(&client.iam_url(&format!("api-keys/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, data.id(), e))?;
        Self::apply_response(data, &key);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        _prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let request = ApiKeyRequest {
            spec: ApiKeyRequestSpec {
                display_name: Some(data.get_string("display_name")),
                description: Some(data.get_string("description")),
                ..Default::default()
            },
        };
        let body = request_body(DISPLAY_NAME, &request)?;

        let updated: ApiKey = client
            .http
            .patch(&client.iam_url(&format!("api-keys/{}", data.id())), &[], &body)
            .await
            .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, data.id(), e))?;

        tracing::info!("Finished updating {} {:?}", DISPLAY_NAME, updated.id);
        Self::apply_response(data, &updated);
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        client
            .http
            .delete(&client.iam_url(&format!("api-keys/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }

    fn import_state(&self, parts: &[&str], data: &mut ResourceData) -> Result<(), ProviderError> {
        Self::import_with_secret(parts, non_empty_env(ENV_IMPORT_API_KEY_SECRET), data)
    }
}
