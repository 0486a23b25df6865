//! Error types for the convertkit server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use convertkit_core::ToolError;
use thiserror::Error;
use tracing::{error, warn};

use crate::pages::Page;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Could not read upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("{0}")]
    MissingInput(&'static str),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Tool(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Tool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Upload(e) => e.status(),
            ServerError::MissingInput(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages that read on their own, without the "Error <action>:" prefix
    fn stands_alone(&self) -> bool {
        matches!(
            self,
            ServerError::MissingInput(_)
                | ServerError::Tool(ToolError::IncorrectPassword)
                | ServerError::Tool(ToolError::BackendUnavailable(_))
        )
    }
}

/// A failed conversion, rendered as its form page with an alert
#[derive(Debug)]
pub struct ToolFailure {
    pub page: Page,
    /// Gerund phrase for the message, e.g. "merging PDFs"
    pub action: &'static str,
    pub error: ServerError,
}

impl ToolFailure {
    pub fn message(&self) -> String {
        if self.error.stands_alone() {
            self.error.to_string()
        } else {
            format!("Error {}: {}", self.action, self.error)
        }
    }
}

impl IntoResponse for ToolFailure {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let message = self.message();

        if status.is_server_error() {
            error!(action = self.action, status = status.as_u16(), "{}", message);
        } else {
            warn!(action = self.action, status = status.as_u16(), "{}", message);
        }

        (status, self.page.render(Some(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(error: ServerError) -> ToolFailure {
        ToolFailure {
            page: Page::Pdf,
            action: "merging PDFs",
            error,
        }
    }

    #[test]
    fn test_message_prefixed_with_action() {
        let f = failure(ToolError::InvalidInput("No documents to merge".into()).into());
        assert_eq!(
            f.message(),
            "Error merging PDFs: Invalid input: No documents to merge"
        );
    }

    #[test]
    fn test_password_message_stands_alone() {
        let f = failure(ToolError::IncorrectPassword.into());
        assert_eq!(f.message(), "Incorrect password for decrypting PDF.");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::from(ToolError::ParseError("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(ToolError::OperationError("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::Timeout(5).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ServerError::MissingInput("No image provided").status(),
            StatusCode::BAD_REQUEST
        );
    }
}
