//! HTTP utilities for Confluent Cloud REST API calls

use super::auth::CloudCredentials;
use crate::error::ApiError;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human-readable message out of a Confluent error body.
///
/// The management APIs answer with `{"errors":[{"detail": ...}]}`, the
/// Connect API with `{"error_code": ..., "message": ...}`. Anything else is
/// returned as-is.
pub fn extract_error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    if let Some(errors) = value.get("errors").and_then(|v| v.as_array()) {
        let details: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("detail").or_else(|| e.get("title")).and_then(|d| d.as_str()))
            .collect();
        if !details.is_empty() {
            return details.join("; ");
        }
    }

    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        return message.to_string();
    }

    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return message.to_string();
    }

    body.trim().to_string()
}

/// HTTP client wrapper for Confluent Cloud API calls
#[derive(Clone)]
pub struct ConfluentHttpClient {
    client: Client,
    credentials: CloudCredentials,
}

impl ConfluentHttpClient {
    /// Create a new HTTP client
    pub fn new(credentials: CloudCredentials) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("tfconfluent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.api_key, Some(self.credentials.api_secret()))
    }

    /// Send a request and return the raw body of a 2xx response
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let request_id = uuid::Uuid::new_v4();
        let request = request.build()?;
        tracing::debug!(%request_id, "{} {}", request.method(), request.url());

        let response = self.client.execute(request).await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(%request_id, "API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: extract_error_detail(&body),
            });
        }

        tracing::trace!(%request_id, "{} {}", status, sanitize_for_log(&body));
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        // Handle empty response
        if body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(body)?)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, url).query(query);
        let body = self.execute(request).await?;
        Self::decode(&body)
    }

    /// Make a POST request with a JSON body
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, url).json(body);
        let body = self.execute(request).await?;
        Self::decode(&body)
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PATCH, url).query(query).json(body);
        let body = self.execute(request).await?;
        Self::decode(&body)
    }

    /// Make a PUT request with a JSON body
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PUT, url).json(body);
        let body = self.execute(request).await?;
        Self::decode(&body)
    }

    /// Make a PUT request with no body, ignoring the response
    pub async fn put_empty(&self, url: &str) -> Result<(), ApiError> {
        let request = self.request(Method::PUT, url);
        self.execute(request).await?;
        Ok(())
    }

    /// Make a DELETE request, ignoring any response body
    pub async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, url).query(query);
        self.execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_extract_error_detail_variants() {
        assert_eq!(
            extract_error_detail(r#"{"errors":[{"status":"404","detail":"Not found"}]}"#),
            "Not found"
        );
        assert_eq!(
            extract_error_detail(r#"{"error_code":409,"message":"Connector exists"}"#),
            "Connector exists"
        );
        assert_eq!(
            extract_error_detail(r#"{"error":{"code":400,"message":"bad"}}"#),
            "bad"
        );
        assert_eq!(extract_error_detail("plain text "), "plain text");
    }
}
