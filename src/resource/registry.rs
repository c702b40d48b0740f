//! Resource Registry - lookup of resource and data source types by name
//!
//! Every type the provider serves is registered once here and looked up by
//! its configuration name (`confluent_kafka_cluster`) by the rest of the
//! application.

use super::{DataSource, Resource};
use crate::data_sources::{
    certificate_pools::CertificatePoolsDataSource, environment::EnvironmentDataSource,
    environments::EnvironmentsDataSource, users::UsersDataSource,
};
use crate::resources::{
    api_key::ApiKeyResource, connector::ConnectorResource, environment::EnvironmentResource,
    kafka_cluster::KafkaClusterResource, private_link_attachment::PrivateLinkAttachmentResource,
    role_binding::RoleBindingResource, schema_registry_cluster::SchemaRegistryClusterResource,
    service_account::ServiceAccountResource,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Every registered type, keyed by configuration name
pub struct Registry {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl Registry {
    fn build() -> Self {
        let resources: Vec<Box<dyn Resource>> = vec![
            Box::new(EnvironmentResource),
            Box::new(KafkaClusterResource),
            Box::new(SchemaRegistryClusterResource),
            Box::new(PrivateLinkAttachmentResource),
            Box::new(ServiceAccountResource),
            Box::new(ApiKeyResource),
            Box::new(RoleBindingResource),
            Box::new(ConnectorResource),
        ];
        let data_sources: Vec<Box<dyn DataSource>> = vec![
            Box::new(EnvironmentDataSource),
            Box::new(EnvironmentsDataSource),
            Box::new(UsersDataSource),
            Box::new(CertificatePoolsDataSource),
        ];

        Self {
            resources: resources.into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: data_sources.into_iter().map(|d| (d.type_name(), d)).collect(),
        }
    }
}

/// Global registry
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get the registry (built on first access)
pub fn get_registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::build)
}

/// Get a resource type by name
pub fn get_resource(key: &str) -> Option<&'static dyn Resource> {
    get_registry().resources.get(key).map(|r| r.as_ref())
}

/// Get a data source type by name
pub fn get_data_source(key: &str) -> Option<&'static dyn DataSource> {
    get_registry().data_sources.get(key).map(|d| d.as_ref())
}

/// All resource type names, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    get_registry().resources.keys().copied().collect()
}

/// All data source type names, sorted
pub fn get_all_data_source_keys() -> Vec<&'static str> {
    get_registry().data_sources.keys().copied().collect()
}
