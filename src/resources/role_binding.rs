//! `confluent_role_binding`

use crate::confluent::client::ConfluentClient;
use crate::error::{Operation, ProviderError};
use crate::resource::Resource;
use crate::resources::request_body;
use crate::schema::{AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DISPLAY_NAME: &str = "Role Binding";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub principal: String,
    pub role_name: String,
    pub crn_pattern: String,
}

pub struct RoleBindingResource;

impl RoleBindingResource {
    pub fn to_api_request(data: &ResourceData) -> RoleBinding {
        RoleBinding {
            id: String::new(),
            principal: data.get_string("principal"),
            role_name: data.get_string("role_name"),
            crn_pattern: data.get_string("crn_pattern"),
        }
    }

    pub fn apply_response(data: &mut ResourceData, binding: &RoleBinding) {
        data.set_id(&binding.id);
        data.set("principal", binding.principal.as_str());
        data.set("role_name", binding.role_name.as_str());
        data.set("crn_pattern", binding.crn_pattern.as_str());
    }
}

#[async_trait]
impl Resource for RoleBindingResource {
    fn type_name(&self) -> &'static str {
        "confluent_role_binding"
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "principal",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("A principal User to bind the role to, e.g. User:sa-abc123"),
            )
            .with(
                "role_name",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("A name of the role to bind to the principal"),
            )
            .with(
                "crn_pattern",
                Attribute::required(AttrKind::String)
                    .force_new()
                    .describe("A CRN that specifies the scope and resource patterns"),
            )
    }

    fn import_parts(&self) -> &'static [&'static str] {
        &["role_binding_id"]
    }

    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let body = request_body(DISPLAY_NAME, &Self::to_api_request(data))?;

        let created: RoleBinding = client
            .http
            .post(&client.iam_url("role-bindings"), &body)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::Create, DISPLAY_NAME, "", e))?;

        tracing::info!("Finished creating {} {:?}", DISPLAY_NAME, created.id);
        Self::apply_response(data, &created);
        Ok(())
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let binding: RoleBinding = client
            .http
            .get(&client.iam_url(&format!("role-bindings/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Read, DISPLAY_NAME, data.id(), e))?;
        Self::apply_response(data, &binding);
        Ok(())
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError> {
        client
            .http
            .delete(&client.iam_url(&format!("role-bindings/{}", data.id())), &[])
            .await
            .map_err(|e| ProviderError::api(Operation::Delete, DISPLAY_NAME, data.id(), e))
    }
}
