//! Provider error taxonomy
//!
//! Every fallible library operation returns [`ProviderError`]. HTTP-level
//! failures are carried as [`ApiError`] and wrapped with the operation,
//! resource type and id they happened under. At the CLI edge errors are
//! turned into [`Diagnostic`]s.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error returned by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("API request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The request never produced a response
    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected
    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status code, when the server responded
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 404 and 403 both mean the object is gone (or never was) as far as
    /// drift detection is concerned.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404) | Some(403))
    }
}

/// Lifecycle operation an error happened under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    List,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "creating",
            Self::Read => "reading",
            Self::Update => "updating",
            Self::Delete => "deleting",
            Self::Import => "importing",
            Self::List => "listing",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to the provider runtime
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("error {operation} {resource_type} {id:?}: {source}")]
    Api {
        operation: Operation,
        resource_type: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("{resource_type} {id:?} not found")]
    NotFound { resource_type: String, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("invalid import ID {id:?}: expected format {expected:?}")]
    InvalidImportId { id: String, expected: String },

    #[error(
        "timed out after {elapsed:?} waiting for {kind} {id:?} to reach {target}; last status {last_status:?}"
    )]
    Timeout {
        kind: String,
        id: String,
        target: String,
        last_status: Option<String>,
        elapsed: Duration,
    },

    #[error("{kind} {id:?} entered status {status:?}: {detail}")]
    ProvisioningFailed {
        kind: String,
        id: String,
        status: String,
        detail: String,
    },

    #[error("pagination loop detected: page token {token:?} was already requested")]
    PaginationLoop { token: String },

    #[error("failed to encode {what} as JSON: {source}")]
    Marshal {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Wrap an [`ApiError`] with the call site that produced it.
    ///
    /// 404/403 responses become [`ProviderError::NotFound`] so callers can
    /// decide contextually whether absence is fatal.
    pub fn api(operation: Operation, resource_type: &str, id: &str, source: ApiError) -> Self {
        if source.is_not_found() {
            return Self::NotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            };
        }
        Self::Api {
            operation,
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            source,
        }
    }

    /// Same as [`ProviderError::api`] but never folds 404/403 into
    /// `NotFound`; used for create and list calls where absence means the
    /// parent is missing, which is an ordinary failure.
    pub fn api_strict(operation: Operation, resource_type: &str, id: &str, source: ApiError) -> Self {
        Self::Api {
            operation,
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Convert into a diagnostic for display
    pub fn diagnostic(&self) -> Diagnostic {
        let summary = match self {
            Self::Api { source, .. } => match source.status().and_then(status_hint) {
                Some(hint) => format!("{self}. {hint}"),
                None => self.to_string(),
            },
            _ => self.to_string(),
        };

        let detail = match self {
            Self::Api { source: ApiError::Status { detail, .. }, .. } => Some(detail.clone()),
            Self::ProvisioningFailed { detail, .. } => Some(detail.clone()),
            Self::Validation(_) => Some("No request was sent to Confluent Cloud.".to_string()),
            _ => None,
        };

        Diagnostic {
            severity: Severity::Error,
            summary,
            detail,
        }
    }
}

/// Actionable hint for common HTTP failures
fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        401 => Some("Check CONFLUENT_CLOUD_API_KEY and CONFLUENT_CLOUD_API_SECRET"),
        409 => Some("The resource may already exist or be in use"),
        429 => Some("Rate limit exceeded, try again later"),
        400 | 422 => Some("Check the resource arguments"),
        500..=599 => Some("Confluent Cloud is temporarily unavailable, try again"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic as reported back to the plan/apply engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_and_missing_fold_into_not_found() {
        for status in [403, 404] {
            let err = ProviderError::api(
                Operation::Read,
                "Kafka Cluster",
                "lkc-1",
                ApiError::Status {
                    status,
                    detail: "gone".into(),
                },
            );
            assert!(err.is_not_found(), "status {status} should be not found");
        }
    }

    #[test]
    fn test_server_error_stays_api_error() {
        let err = ProviderError::api(
            Operation::Update,
            "Environment",
            "env-1",
            ApiError::Status {
                status: 500,
                detail: "boom".into(),
            },
        );
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "error updating Environment \"env-1\": API request failed with status 500: boom"
        );
    }

    #[test]
    fn test_diagnostic_carries_hint_and_detail() {
        let err = ProviderError::api_strict(
            Operation::Create,
            "API Key",
            "",
            ApiError::Status {
                status: 401,
                detail: "invalid credentials".into(),
            },
        );
        let diag = err.diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.summary.contains("CONFLUENT_CLOUD_API_KEY"));
        assert_eq!(diag.detail.as_deref(), Some("invalid credentials"));
    }
}
