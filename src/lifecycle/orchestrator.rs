//! Lifecycle orchestrator
//!
//! Sequences the calls of a [`Resource`] for each operation and enforces
//! the rules that hold for every resource type:
//!
//! - configuration is validated against the schema before any request
//! - only allow-listed attributes may change in place
//! - a missing object on refresh is drift (untrack it), not an error,
//!   unless the object was created or imported in this same operation
//! - a missing object on delete means the delete already happened
//! - an object that was created but never became ready is kept as
//!   tainted so it can still be deleted

use super::import::parse_import_id;
use crate::confluent::client::ConfluentClient;
use crate::error::{Operation, ProviderError};
use crate::resource::{DataSource, Resource};
use crate::schema::{AttrValue, Presence, ResourceData};
use std::fmt;

/// Where a resource instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmanaged,
    Creating,
    Polling(Operation),
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
    /// Exists remotely, but its create did not finish
    Tainted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polling(op) => write!(f, "Polling ({})", op),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One tracked resource and its lifecycle state
#[derive(Debug, Clone)]
pub struct ResourceInstance {
    pub state: LifecycleState,
    pub data: ResourceData,
}

impl ResourceInstance {
    /// An instance loaded from stored state
    pub fn managed(data: ResourceData) -> Self {
        Self {
            state: LifecycleState::Created,
            data,
        }
    }
}

/// A failed create. When the object already exists remotely it comes back
/// in `tainted` so the caller can keep tracking it.
#[derive(Debug)]
pub struct CreateError {
    pub error: ProviderError,
    pub tainted: Option<ResourceInstance>,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for CreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ProviderError> for CreateError {
    fn from(error: ProviderError) -> Self {
        Self { error, tainted: None }
    }
}

/// Drives one resource type against one client
pub struct Lifecycle<'a> {
    resource: &'a dyn Resource,
    client: &'a ConfluentClient,
}

impl<'a> Lifecycle<'a> {
    pub fn new(resource: &'a dyn Resource, client: &'a ConfluentClient) -> Self {
        Self { resource, client }
    }

    fn transition(&self, instance: &mut ResourceInstance, to: LifecycleState) {
        tracing::info!(
            resource_type = self.resource.type_name(),
            id = %instance.data.id(),
            "{} -> {}",
            instance.state,
            to
        );
        instance.state = to;
    }

    async fn poll_if_needed(
        &self,
        instance: &mut ResourceInstance,
        operation: Operation,
    ) -> Result<(), ProviderError> {
        if !self.resource.waits_for(operation) {
            return Ok(());
        }
        self.transition(instance, LifecycleState::Polling(operation));
        self.resource.wait(self.client, operation, &instance.data).await
    }

    /// Create → (Poll) → Read
    pub async fn create(&self, config: ResourceData) -> Result<ResourceInstance, CreateError> {
        self.resource.schema().validate(config.attributes())?;

        let mut instance = ResourceInstance {
            state: LifecycleState::Unmanaged,
            data: config,
        };
        instance.data.mark_new_resource(true);

        self.transition(&mut instance, LifecycleState::Creating);
        self.resource.create(self.client, &mut instance.data).await?;

        let settled = match self.poll_if_needed(&mut instance, Operation::Create).await {
            Ok(()) => self.resource.read(self.client, &mut instance.data).await,
            Err(e) => Err(e),
        };
        instance.data.mark_new_resource(false);

        if let Err(error) = settled {
            tracing::warn!(
                "{} {:?} was created but did not become ready; it is kept as tainted and not rolled back",
                self.resource.display_name(),
                instance.data.id()
            );
            self.transition(&mut instance, LifecycleState::Tainted);
            return Err(CreateError {
                error,
                tainted: Some(instance),
            });
        }

        self.transition(&mut instance, LifecycleState::Created);
        Ok(instance)
    }

    /// Refresh from the server. Drift (not found) untracks the instance.
    pub async fn read(&self, instance: &mut ResourceInstance) -> Result<(), ProviderError> {
        match self.resource.read(self.client, &mut instance.data).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() && !instance.data.is_new_resource() => {
                tracing::warn!(
                    "{} {:?} not found, removing from state because it is no longer present in Confluent Cloud",
                    self.resource.display_name(),
                    instance.data.id()
                );
                instance.data.set_id("");
                self.transition(instance, LifecycleState::Unmanaged);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reject immutable changes, then Update → (Poll) → Read
    pub async fn update(
        &self,
        instance: &mut ResourceInstance,
        config: ResourceData,
    ) -> Result<(), ProviderError> {
        if instance.state == LifecycleState::Tainted {
            return Err(ProviderError::validation(format!(
                "{} {:?} is tainted because its create did not finish; delete it and create it again",
                self.resource.display_name(),
                instance.data.id()
            )));
        }

        let schema = self.resource.schema();
        schema.validate(config.attributes())?;

        let changed = config.changed_attributes(&instance.data, &schema);
        let mutable = self.resource.mutable_attributes();
        let immutable: Vec<&str> = changed
            .iter()
            .map(String::as_str)
            .filter(|name| !mutable.contains(name))
            .collect();

        if !immutable.is_empty() {
            return Err(ProviderError::validation(format!(
                "error updating {} {:?}: {} cannot be updated in place, the resource must be replaced (only {} can be updated)",
                self.resource.display_name(),
                instance.data.id(),
                immutable
                    .iter()
                    .map(|n| format!("{:?}", n))
                    .collect::<Vec<_>>()
                    .join(", "),
                if mutable.is_empty() {
                    "nothing".to_string()
                } else {
                    mutable.join(", ")
                }
            )));
        }

        if changed.is_empty() {
            tracing::debug!("No changes for {} {:?}", self.resource.display_name(), instance.data.id());
            return Ok(());
        }

        let prior = instance.data.clone();
        let mut planned = config;
        planned.set_id(prior.id());
        for (name, attribute) in schema.iter() {
            let carry = match attribute.presence {
                Presence::Computed => true,
                Presence::OptionalComputed => planned.get(name).map_or(true, AttrValue::is_empty),
                Presence::Required | Presence::Optional => false,
            };
            if carry {
                if let Some(value) = prior.get(name) {
                    planned.set(name, value.clone());
                }
            }
        }

        self.transition(instance, LifecycleState::Updating);
        self.resource.update(self.client, &prior, &mut planned).await?;
        instance.data = planned;

        self.poll_if_needed(instance, Operation::Update).await?;

        self.resource.read(self.client, &mut instance.data).await?;
        self.transition(instance, LifecycleState::Updated);
        Ok(())
    }

    /// Delete → (Poll). Already gone counts as deleted.
    pub async fn delete(&self, instance: &mut ResourceInstance) -> Result<(), ProviderError> {
        self.transition(instance, LifecycleState::Deleting);

        match self.resource.delete(self.client, &instance.data).await {
            Ok(()) => self.poll_if_needed(instance, Operation::Delete).await?,
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "{} {:?} was already deleted",
                    self.resource.display_name(),
                    instance.data.id()
                );
            }
            Err(e) => return Err(e),
        }

        instance.data.set_id("");
        self.transition(instance, LifecycleState::Deleted);
        Ok(())
    }

    /// Parse the composite id and populate everything with a Read
    pub async fn import(&self, id: &str) -> Result<ResourceInstance, ProviderError> {
        let parts = parse_import_id(id, self.resource.import_parts())?;

        let mut instance = ResourceInstance {
            state: LifecycleState::Unmanaged,
            data: ResourceData::new(),
        };
        self.resource.import_state(&parts, &mut instance.data)?;
        instance.data.mark_new_resource(true);

        tracing::info!("Importing {} {:?}", self.resource.display_name(), id);
        self.resource.read(self.client, &mut instance.data).await?;

        instance.data.mark_new_resource(false);
        self.transition(&mut instance, LifecycleState::Created);
        Ok(instance)
    }
}

/// Validate configuration and run a data source lookup
pub async fn read_data_source(
    data_source: &dyn DataSource,
    client: &ConfluentClient,
    config: ResourceData,
) -> Result<ResourceData, ProviderError> {
    data_source.schema().validate(config.attributes())?;
    let mut data = config;
    data_source.read(client, &mut data).await?;
    Ok(data)
}
