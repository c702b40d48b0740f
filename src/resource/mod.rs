//! Resource abstraction layer
//!
//! Every managed Confluent Cloud object implements [`Resource`]; read-only
//! lookups implement [`DataSource`]. The lifecycle orchestrator drives
//! these traits; implementations only translate between declared state and
//! the REST API.
//!
//! # Architecture
//!
//! - [`registry`] - Static lookup of resource and data-source types by name
//! - `crate::resources` - Managed resource implementations
//! - `crate::data_sources` - Data source implementations
//!
//! # Example
//!
//! ```ignore
//! use tfconfluent::resource::get_resource;
//!
//! let cluster = get_resource("confluent_kafka_cluster").unwrap();
//! println!("{:?}", cluster.import_parts());
//! ```

mod registry;

pub use registry::*;

use crate::confluent::client::ConfluentClient;
use crate::error::{Operation, ProviderError};
use crate::schema::{ResourceData, Schema};
use async_trait::async_trait;

/// A managed resource type
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name as used in configuration (`confluent_kafka_cluster`)
    fn type_name(&self) -> &'static str;

    /// Human name used in messages (`Kafka Cluster`)
    fn display_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Attributes that may change without replacing the resource
    fn mutable_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Names of the `/`-separated components of an import id
    fn import_parts(&self) -> &'static [&'static str];

    /// Whether the orchestrator must wait after `operation`
    fn waits_for(&self, _operation: Operation) -> bool {
        false
    }

    /// Send the create request and record the new id in `data`
    async fn create(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refresh `data` from the server. Absence is reported as
    /// [`ProviderError::NotFound`]; the orchestrator decides what it means.
    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Apply the mutable attributes of `data`
    async fn update(
        &self,
        _client: &ConfluentClient,
        _prior: &ResourceData,
        _data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::validation(format!(
            "{} does not support in-place updates",
            self.display_name()
        )))
    }

    async fn delete(&self, client: &ConfluentClient, data: &ResourceData) -> Result<(), ProviderError>;

    /// Block until the object settles after `operation`
    async fn wait(
        &self,
        _client: &ConfluentClient,
        _operation: Operation,
        _data: &ResourceData,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Seed `data` from the parsed components of an import id
    fn import_state(&self, parts: &[&str], data: &mut ResourceData) -> Result<(), ProviderError> {
        if let [id] = parts {
            data.set_id(id);
        }
        Ok(())
    }

    /// Attributes excluded when comparing imported state with created state
    fn import_verify_ignore(&self) -> Vec<&'static str> {
        self.schema().sensitive_attributes()
    }
}

/// A read-only lookup
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &ConfluentClient, data: &mut ResourceData) -> Result<(), ProviderError>;
}
