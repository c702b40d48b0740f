//! `confluent_certificate_pools` data source
//!
//! Lists the identity pools of one certificate authority.

use super::list_all;
use crate::confluent::client::ConfluentClient;
use crate::error::ProviderError;
use crate::resource::DataSource;
use crate::schema::{id_block, AttrKind, Attribute, ResourceData, Schema};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CertificatePool {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub external_identifier: String,
    #[serde(default)]
    pub filter: String,
}

pub struct CertificatePoolsDataSource;

#[async_trait]
impl DataSource for CertificatePoolsDataSource {
    fn type_name(&self) -> &'static str {
        "confluent_certificate_pools"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                "certificate_authority",
                Attribute::required(AttrKind::block(id_block())),
            )
            .with("ids", Attribute::computed(AttrKind::StringSet))
            .with(
                "display_names",
                Attribute::computed(AttrKind::StringMap).describe("Display name of each pool, keyed by id"),
            )
    }

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let authority = data
            .block_str("certificate_authority", "id")
            .ok_or_else(|| ProviderError::validation("certificate_authority.id must be set"))?
            .to_string();

        let url = client.iam_url(&format!(
            "certificate-authorities/{}/identity-pools",
            urlencoding::encode(&authority)
        ));
        let pools: Vec<CertificatePool> = list_all(client, &url, "Certificate Pools").await?;

        tracing::debug!("Loaded {} certificate pools of {:?}", pools.len(), authority);
        let ids: BTreeSet<String> = pools.iter().map(|pool| pool.id.clone()).collect();
        let display_names: BTreeMap<String, String> = pools
            .into_iter()
            .map(|pool| (pool.id, pool.display_name))
            .collect();
        data.set("ids", ids);
        data.set("display_names", display_names);
        data.set_id(&authority);
        Ok(())
    }
}
