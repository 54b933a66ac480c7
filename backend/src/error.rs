//! Backend-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("{field} field is required")]
    MissingField { field: &'static str },

    #[error("Unknown template: {name}")]
    UnknownTemplate { name: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("XML rendering failed: {message}")]
    Render { message: String },

    #[error("HTTP server startup failed on {addr}: {source}")]
    ServerStartup {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BackendError {
    pub fn render(error: impl std::fmt::Display) -> Self {
        Self::Render {
            message: error.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::MissingField { .. } | Self::UnknownTemplate { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BackendError::MissingField { field: "content" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BackendError::NotFound { kind: "Data", id: "x".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BackendError::render("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_are_client_facing() {
        assert_eq!(
            BackendError::NotFound { kind: "Data", id: "abc".into() }.to_string(),
            "Data abc not found"
        );
        assert_eq!(
            BackendError::MissingField { field: "content" }.to_string(),
            "content field is required"
        );
    }
}
