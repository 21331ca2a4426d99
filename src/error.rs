//! HTTP error surface.
//!
//! Every failure leaving a handler becomes an `{error, details}` JSON body,
//! matching what the browser client already expects. Upstream LLM failures
//! pass their status code through.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Truncation length for raw model output echoed back in parse errors.
const RAW_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Unsupported file type")]
    UnsupportedFileType { supported: Vec<&'static str> },

    #[error("Method Not Allowed")]
    MethodNotAllowed(&'static str),

    #[error("Could not extract text from document")]
    Unprocessable(String),

    #[error("Failed to get AI response")]
    Upstream { status: u16, body: String },

    #[error("Empty response from AI")]
    EmptyResponse,

    #[error("Failed to parse {mode} JSON")]
    Parse { mode: &'static str, details: String, raw: String },

    #[error("{mode} validation failed")]
    Validation { mode: &'static str, details: String },

    #[error("Server error occurred")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string(), "details": details }),
            ),
            ApiError::UnsupportedFileType { supported } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Unsupported file type", "supportedTypes": supported }),
            ),
            ApiError::MethodNotAllowed(details) => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method Not Allowed", "details": details }),
            ),
            ApiError::Unprocessable(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "details": details }),
            ),
            ApiError::Upstream { status, body } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({
                    "error": "Failed to get AI response",
                    "details": { "status": status, "message": truncate(body, 500) },
                }),
            ),
            ApiError::EmptyResponse => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Empty response from AI", "details": "No content generated" }),
            ),
            ApiError::Parse { details, raw, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": self.to_string(),
                    "details": details,
                    "rawContent": truncate(raw, RAW_SNIPPET_CHARS),
                }),
            ),
            ApiError::Validation { details, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string(), "details": details }),
            ),
            ApiError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server error occurred", "details": err.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn upstream_error_preserves_status() {
        let err = ApiError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn unsupported_file_type_is_bad_request() {
        let err = ApiError::UnsupportedFileType {
            supported: vec!["application/pdf"],
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_error_is_internal() {
        let err = ApiError::Parse {
            mode: "quiz",
            details: "expected value".to_string(),
            raw: "not json".to_string(),
        };
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
