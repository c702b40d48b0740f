//! `confluent_users` data source

use super::list_all;
use crate::confluent::client::ConfluentClient;
use crate::error::ProviderError;
use crate::resource::DataSource;
use crate::schema::{AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

pub struct UsersDataSource;

#[async_trait]
impl DataSource for UsersDataSource {
    fn type_name(&self) -> &'static str {
        "confluent_users"
    }

    fn schema(&self) -> Schema {
        Schema::new().with(
            "ids",
            Attribute::computed(AttrKind::StringSet).describe("The ids of every User in the organization"),
        )
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let users: Vec<User> = list_all(client, &client.iam_url("users"), "Users").await?;

        tracing::debug!("Loaded {} users", users.len());
        let ids: BTreeSet<String> = users.into_iter().map(|user| user.id).collect();
        data.set("ids", ids);
        data.set_id("users");
        Ok(())
    }
}
