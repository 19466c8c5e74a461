//! Rendering [`Error`] as an HTTP response.

use crate::errors::{Error, ErrorKind};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Message safe to show to the user
    pub error: String,
    /// Stable error class, see [`ErrorKind::as_str`]
    pub kind: &'static str,
    /// Offending input field, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Whether retrying the same request may succeed
    pub retryable: bool,
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("path", rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: message,
            kind: kind.as_str(),
            field: self.field(),
            retryable: kind.is_retryable(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidAmount { amount: 0 }, StatusCode::UNPROCESSABLE_ENTITY),
            (Error::GroupNotFound { id: 1 }, StatusCode::NOT_FOUND),
            (
                Error::Conflict {
                    message: "x".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                Error::Forbidden {
                    message: "x".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                Error::Config {
                    message: "x".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
