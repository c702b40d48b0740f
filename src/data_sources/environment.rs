//! `confluent_environment` data source

use super::list_all;
use crate::confluent::client::ConfluentClient;
use crate::error::ProviderError;
use crate::resource::DataSource;
use crate::resources::environment::{stream_governance_schema, Environment, EnvironmentResource};
use crate::schema::{AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;

const LOOKUP_KEYS: &[&str] = &["id", "display_name"];

pub struct EnvironmentDataSource;

impl EnvironmentDataSource {
    /// The single environment called `display_name`
    fn find_by_display_name(
        environments: Vec<Environment>,
        display_name: &str,
    ) -> Result<Environment, ProviderError> {
        let mut matching: Vec<Environment> = environments
            .into_iter()
            .filter(|env| env.display_name == display_name)
            .collect();

        match matching.len() {
            1 => Ok(matching.remove(0)),
            0 => Err(ProviderError::validation(format!(
                "error reading Environment: there is no Environment with display_name {:?}",
                display_name
            ))),
            n => Err(ProviderError::validation(format!(
                "error reading Environment: there are {} Environments with display_name {:?}, use the id instead",
                n, display_name
            ))),
        }
    }
}

#[async_trait]
impl DataSource for EnvironmentDataSource {
    fn type_name(&self) -> &'static str {
        "confluent_environment"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "id",
                Attribute::optional_computed(AttrKind::String).exactly_one_of(LOOKUP_KEYS),
            )
            .with(
                "display_name",
                Attribute::optional_computed(AttrKind::String).exactly_one_of(LOOKUP_KEYS),
            )
            .with(
                "stream_governance",
                Attribute::computed(AttrKind::block(stream_governance_schema())),
            )
            .with("resource_name", Attribute::computed(AttrKind::String))
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let environment = match (data.get_str("id"), data.get_str("display_name")) {
            (Some(id), _) => EnvironmentResource::fetch(client, id).await?,
            (None, Some(display_name)) => {
                let display_name = display_name.to_string();
                let environments = list_all(client, &client.org_url("environments"), "Environments").await?;
                Self::find_by_display_name(environments, &display_name)?
            }
            (None, None) => {
                return Err(ProviderError::validation(
                    "exactly one of \"id\", \"display_name\" must be specified",
                ))
            }
        };

        EnvironmentResource::apply_response(data, &environment);
        data.set("id", environment.id.as_str());
        Ok(())
    }
}
