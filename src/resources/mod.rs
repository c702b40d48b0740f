//! Managed resource implementations
//!
//! One module per Confluent Cloud object. Each module owns the wire types of
//! its API, the mapping between declared state and those types, and the
//! [`Resource`](crate::resource::Resource) implementation.

pub mod api_key;
pub mod connector;
pub mod environment;
pub mod kafka_cluster;
pub mod private_link_attachment;
pub mod role_binding;
pub mod schema_registry_cluster;
pub mod service_account;

use crate::error::ProviderError;
use crate::schema::ResourceData;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Placeholder written to the log instead of a secret value
const REDACTED: &str = "<redacted>";

/// Encode a request body. Failure here is fatal: nothing can be sent.
pub(crate) fn request_body<T: Serialize>(what: &str, request: &T) -> Result<Value, ProviderError> {
    redacted_request_body(what, request, &BTreeSet::new())
}

/// Encode a request body that carries secrets. The values of every object
/// key in `secret_keys` are masked in the debug log; the returned body is
/// untouched.
pub(crate) fn redacted_request_body<T: Serialize>(
    what: &str,
    request: &T,
    secret_keys: &BTreeSet<String>,
) -> Result<Value, ProviderError> {
    let body = serde_json::to_value(request).map_err(|source| ProviderError::Marshal {
        what: what.to_string(),
        source,
    })?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut logged = body.clone();
        redact(&mut logged, secret_keys);
        tracing::debug!("{} request: {}", what, logged);
    }
    Ok(body)
}

fn redact(value: &mut Value, secret_keys: &BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if secret_keys.contains(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact(field, secret_keys);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| redact(item, secret_keys)),
        _ => {}
    }
}

/// Id of the `environment` block every environment-scoped resource carries
pub(crate) fn environment_id(data: &ResourceData) -> Result<&str, ProviderError> {
    data.block_str("environment", "id")
        .ok_or_else(|| ProviderError::validation("environment.id must be set"))
}

/// Log a value as JSON at debug level. Encoding problems only cost the log line.
pub(crate) fn debug_json<T: Serialize>(what: &str, value: &T) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    match serde_json::to_string(value) {
        Ok(json) => tracing::debug!("{}: {}", what, json),
        Err(e) => tracing::warn!("Could not encode {} for logging: {}", what, e),
    }
}
