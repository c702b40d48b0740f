//! `confluent_service_account`

use crate::confluent::client::ConfluentClient;
use crate::error::{Operation, ProviderError};
use crate::resource::Resource;
use crate::resources::request_body;
use crate::schema::{AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DISPLAY_NAME: &str = "Service Account";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceAccount {
    pub id: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

pub struct ServiceAccountResource;

impl ServiceAccountResource {
    pub fn to_api_request(data: &ResourceData) -> ServiceAccountRequest {
        ServiceAccountRequest {
            display_name: data.get_str("display_name").map(str::to_string),
            description: data.get_str("description").map(str::to_string),
        }
    }

    pub fn apply_response(data: &mut ResourceData, account: &ServiceAccount) {
        data.set_id(&account.id);
        data.set("api_version", account.api_version.as_str());
        data.set("kind", account.kind.as_str());
        data.set("display_name", account.display_name.as_str());
        data.set("description", account.description.as_str());
    }
}

#[async_trait]
impl Resource for ServiceAccountResource {
    fn type_name(&self) -> &'static str {
        "confluent_service_account"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "display_name",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("A unique name for the Service Account"),
            )
            .with("description", Attribute::optional(AttrKind::String))
            .with("api_version", Attribute::computed(AttrKind::String))
            .with("kind", Attribute::computed(AttrKind::String))
    }

    fn mutable_attributes(&self) -> &'static [&'static str] {
        &["description"]
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["service_account_id"]
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: ServiceAccount = client
            .http
            .post(&client.iam_url("service-accounts"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Finished creating {} {:?}", DISPLAY_NAME, created.id);
        Self::apply_response(data, &created);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let account: ServiceAccount = client
            .http
            .get(&client.iam_url(&format!("service-accounts/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, data.id(), e))?;
        Self::apply_response(data, &account);
        Ok(())
    }

    async fn update(
        &self,
        client: &ConfluentClient,
        _prior: &ResourceData,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let request = ServiceAccountRequest {
            display_name: None,
            description: Some(data.get_string("description")),
        };
        let body = request_body(DISPLAY_NAME, &request)?;

        let updated: ServiceAccount = client
            .http
            .patch(&client.iam_url(&format!("service-accounts/{}", data.id())), &[], &body)
            .await
            .map_err(|e| ProviderError::api(Operation::Update, DISPLAY_NAME, data.id(), e))?;

        tracing::info!("Finished updating {} {:?}", DISPLAY_NAME, updated.id);
        Self::apply_response(data, &updated);
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        client
            .http
            .delete(&client.iam_url(&format!("service-accounts/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }
}
