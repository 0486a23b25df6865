//! API handlers for the convertkit server
//!
//! Every conversion endpoint follows the same shape: read the form, redirect
//! back to its page if the required upload is missing, run the conversion on
//! the blocking pool under the configured timeout, and return the artifact.

pub mod image;
pub mod pdf;

use std::time::Duration;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use convertkit_core::{Artifact, ToolResult};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ServerError, ToolFailure};
use crate::form::FormData;
use crate::pages::Page;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub rasterizer: &'static str,
}

/// Handler: GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "convertkit-server",
        version: env!("CARGO_PKG_VERSION"),
        rasterizer: state.rasterizer.name(),
    })
}

/// The page an endpoint belongs to and how its failures are worded
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub page: Page,
    pub action: &'static str,
}

impl Endpoint {
    pub const fn new(page: Page, action: &'static str) -> Self {
        Self { page, action }
    }

    pub fn fail(self, error: impl Into<ServerError>) -> ToolFailure {
        ToolFailure {
            page: self.page,
            action: self.action,
            error: error.into(),
        }
    }

    pub fn redirect(self) -> Response {
        debug!(page = self.page.path(), "Missing upload, redirecting");
        self.page.redirect().into_response()
    }

    /// `None` when the request is not a multipart form at all
    pub async fn read_form(
        self,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Option<FormData>, ToolFailure> {
        match multipart {
            Ok(multipart) => FormData::read(multipart)
                .await
                .map(Some)
                .map_err(|e| self.fail(e)),
            Err(rejection) => {
                debug!("Not a multipart request: {}", rejection);
                Ok(None)
            }
        }
    }

    /// Run a conversion on the blocking pool and serve its artifact
    pub async fn run<F>(self, state: &AppState, convert: F) -> Result<Response, ToolFailure>
    where
        F: FnOnce() -> ToolResult<Artifact> + Send + 'static,
    {
        let artifact = run_blocking(state.timeout_ms, convert)
            .await
            .map_err(|e| self.fail(e))?;

        info!(
            action = self.action,
            filename = %artifact.filename,
            size = artifact.len(),
            "Conversion complete"
        );
        Ok(artifact_response(artifact))
    }
}

/// Run CPU-bound work off the async runtime, bounded by `timeout_ms`
pub async fn run_blocking<T, F>(timeout_ms: u64, work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> ToolResult<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result.map_err(ServerError::from),
        Ok(Err(join_error)) => Err(ServerError::Internal(join_error.to_string())),
        Err(_) => Err(ServerError::Timeout(timeout_ms)),
    }
}

/// Serve an artifact as an attachment
pub fn artifact_response(artifact: Artifact) -> Response {
    let disposition = artifact.content_disposition();
    (
        [
            (header::CONTENT_TYPE, artifact.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertkit_core::ToolError;

    #[tokio::test]
    async fn test_run_blocking_times_out() {
        let result = run_blocking(10, || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServerError::Timeout(10))));
    }

    #[tokio::test]
    async fn test_run_blocking_passes_tool_errors() {
        let result: Result<(), _> =
            run_blocking(1000, || Err(ToolError::InvalidInput("bad".into()))).await;
        assert!(matches!(
            result,
            Err(ServerError::Tool(ToolError::InvalidInput(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_blocking_reports_panics() {
        let result: Result<(), _> = run_blocking(1000, || panic!("boom")).await;
        assert!(matches!(result, Err(ServerError::Internal(_))));
    }
}
