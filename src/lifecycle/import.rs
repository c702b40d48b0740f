//! Composite import ids
//!
//! Resources scoped under a parent are imported with ids such as
//! `<environment-id>/<cluster-id>/<connector-name>`.

use crate::error::ProviderError;

/// Split `id` on `/` into exactly `parts.len()` non-empty components.
///
/// `parts` names the components and only shapes the error message,
/// e.g. `["environment_id", "kafka_cluster_id", "connector_name"]`.
pub fn parse_import_id<'a>(id: &'a str, parts: &[&str]) -> Result<Vec<&'a str>, ProviderError> {
    let components: Vec<&str> = id.split('/').collect();

    if components.len() != parts.len() || components.iter().any(|c| c.trim().is_empty()) {
        return Err(ProviderError::InvalidImportId {
            id: id.to_string(),
            expected: import_format(parts),
        });
    }

    Ok(components)
}

/// `<a>/<b>/<c>`
pub fn import_format(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| format!("<{}>", p))
        .collect::<Vec<_>>()
        .join("/")
}
