//! Data source implementations
//!
//! Read-only lookups. Listing data sources walk every page of their
//! collection through [`fetch_all`](crate::lifecycle::fetch_all).

pub mod certificate_pools;
pub mod environment;
pub mod environments;
pub mod users;

use crate::confluent::client::ConfluentClient;
use crate::confluent::models::ListResponse;
use crate::error::{Operation, ProviderError};
use crate::lifecycle::{fetch_all, Page};
use serde::de::DeserializeOwned;

/// Fetch every item of a paginated collection
pub(crate) async fn list_all<T: DeserializeOwned>(
    client: &ConfluentClient,
    url: &str,
    what: &str,
) -> Result<Vec<T>, ProviderError> {
    fetch_all(move |cursor| async move {
        let query = cursor.query();
        let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let response: ListResponse<T> = client
            .http
            .get(url, &query)
            .await
            .map_err(|e| ProviderError::api_strict(Operation::List, what, "", e))?;
        Ok(Page::from(response))
    })
    .await
}
