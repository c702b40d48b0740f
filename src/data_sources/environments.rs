//! `confluent_environments` data source

use super::list_all;
use crate::confluent::client::ConfluentClient;
use crate::error::ProviderError;
use crate::resource::DataSource;
use crate::resources::environment::Environment;
use crate::schema::{AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use std::collections::BTreeSet;

pub struct EnvironmentsDataSource;

#[async_trait]
impl DataSource for EnvironmentsDataSource {
    fn type_name(&self) -> &'static str {
        "confluent_environments"
    }

    fn schema(&self) -> Schema {
        Schema::new().with(
            "ids",
            Attribute::computed(AttrKind::StringSet).describe("The ids of every Environment in the organization"),
        )
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let environments: Vec<Environment> =
            list_all(client, &client.org_url("environments"), "Environments").await?;

        tracing::debug!("Loaded {} environments", environments.len());
        let ids: BTreeSet<String> = environments.into_iter().map(|env| env.id).collect();
        data.set("ids", ids);
        data.set_id("environments");
        Ok(())
    }
}
