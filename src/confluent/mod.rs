//! Confluent Cloud API interaction module
//!
//! This module provides the core functionality for talking to the Confluent
//! Cloud management APIs: authentication, the HTTP client, and shared wire
//! types.
//!
//! # Module Structure
//!
//! - [`auth`] - Cloud API key/secret credentials
//! - [`client`] - Main client with per-service URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`models`] - Wire types shared across services (references, list envelopes)
//!
//! # Example
//!
//! ```ignore
//! use tfconfluent::confluent::client::ConfluentClient;
//! use tfconfluent::config::ProviderConfig;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ConfluentClient::new(&ProviderConfig::load().with_env())?;
//!     let env: serde_json::Value = client.http.get(&client.org_url("environments/env-1"), &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod models;
