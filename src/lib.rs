//! tfconfluent - Confluent Cloud resources as declarative infrastructure
//!
//! Maps declarative resource schemas onto the Confluent Cloud REST API,
//! waits for asynchronous provisioning, and turns API failures into
//! provider diagnostics.
//!
//! # Modules
//!
//! - [`config`] - Provider configuration
//! - [`confluent`] - Authenticated HTTP client for the Confluent Cloud APIs
//! - [`schema`] - Attribute schemas and declared state
//! - [`lifecycle`] - Pagination, provisioning waits and the lifecycle orchestrator
//! - [`resource`] - Resource and data source traits plus the type registry
//! - [`resources`] - Managed resource implementations
//! - [`data_sources`] - Data source implementations
//! - [`provider`] - Configured provider and on-disk state
//! - [`error`] - Error types and diagnostics

pub mod config;
pub mod confluent;
pub mod data_sources;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;

/// Version injected at compile time via TFCONFLUENT_VERSION env var (set by
/// CI/CD), or "dev" for local builds.
pub const VERSION: &str = match option_env!("TFCONFLUENT_VERSION") {
    Some(v) => v,
    None => "dev",
};

pub use error::{ApiError, Diagnostic, ProviderError};
pub use provider::{Provider, StoredState};
