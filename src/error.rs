//! Error types for the data layer
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::RemoteError;

// == Operation ==
/// Helper operation named in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Count,
    Get,
    Create,
    CreateMany,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::List => "list",
            Operation::Count => "count",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::CreateMany => "create_many",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

// == Store Error Enum ==
/// Unified error type for the data layer and its HTTP surface.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The remote store rejected or failed the operation
    #[error("{operation} on '{table}' failed: {source}")]
    OperationFailed {
        table: String,
        operation: Operation,
        #[source]
        source: RemoteError,
    },

    /// The remote store did not answer within the configured limit
    #[error("{operation} on '{table}' timed out after {}ms", .after.as_millis())]
    Timeout {
        table: String,
        operation: Operation,
        after: Duration,
    },

    /// A write succeeded but no row came back (e.g. update of a missing id)
    #[error("{operation} on '{table}' returned no row")]
    NoRowReturned { table: String, operation: Operation },

    /// Payload could not be turned into a row
    #[error("Invalid payload for '{table}': {reason}")]
    InvalidPayload { table: String, reason: String },

    /// A stored row did not match the expected shape
    #[error("Failed to decode row from '{table}': {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Identity provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl StoreError {
    /// True when the remote store reported its "no rows" code.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, StoreError::OperationFailed { source, .. } if source.is_no_rows())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::OperationFailed { .. } => StatusCode::BAD_GATEWAY,
            StoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            StoreError::NoRowReturned { .. } | StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidPayload { .. } | StoreError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            StoreError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status(), body).into_response()
    }
}

// == Result Type Alias ==
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_message_names_table_and_operation() {
        let err = StoreError::OperationFailed {
            table: "groups".to_string(),
            operation: Operation::CreateMany,
            source: RemoteError::with_code("42501", "permission denied"),
        };

        assert_eq!(
            err.to_string(),
            "create_many on 'groups' failed: permission denied (code 42501)"
        );
        assert!(!err.is_no_rows());
    }

    #[test]
    fn test_timeout_message() {
        let err = StoreError::Timeout {
            table: "sessions".to_string(),
            operation: Operation::List,
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "list on 'sessions' timed out after 1500ms");
    }

    #[test]
    fn test_is_no_rows() {
        let err = StoreError::OperationFailed {
            table: "groups".to_string(),
            operation: Operation::Get,
            source: RemoteError::no_rows(),
        };
        assert!(err.is_no_rows());
        assert!(!StoreError::NotFound("groups/1".to_string()).is_no_rows());
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (StoreError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (StoreError::InvalidRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (
                StoreError::Timeout {
                    table: "t".to_string(),
                    operation: Operation::Get,
                    after: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                StoreError::OperationFailed {
                    table: "t".to_string(),
                    operation: Operation::Delete,
                    source: RemoteError::new("boom"),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (StoreError::Auth(AuthError::NoSession), StatusCode::UNAUTHORIZED),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
