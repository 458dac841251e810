//! HTTP handlers for registry-gateway.
//!
//! Handlers bind and validate the request, call one service and encode the
//! result. Registry failures are tagged with the code of the failing step.

pub mod credentials;
pub mod projects;
pub mod repositories;
pub mod users;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;
use std::future::Future;
use tracing::Instrument;

use crate::services::get_metrics;

pub async fn index() -> &'static str {
    "Hello, World!"
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "registry-gateway" })),
    )
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        get_metrics(),
    )
}

/// Runs a multi-step workflow on its own task and waits for it.
///
/// If the client goes away the handler future is dropped, but the spawned
/// workflow keeps going until its last step (or its compensation) is done.
/// The workflow stays inside the request span, so its events keep the
/// request id and its registry calls carry the trace context.
pub(crate) async fn run_to_completion<F, T, E>(workflow: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    tokio::spawn(workflow.in_current_span())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Workflow task did not complete");
            AppError::InternalError(anyhow::anyhow!("workflow task failed: {}", e))
        })?
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Span;

    #[tokio::test]
    async fn workflow_runs_inside_request_span() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let request_span = tracing::info_span!("http_request", request_id = "req-1");

        let workflow_span = run_to_completion(async { Ok::<_, AppError>(Span::current().id()) })
            .instrument(request_span.clone())
            .await
            .unwrap();

        assert!(request_span.id().is_some());
        assert_eq!(workflow_span, request_span.id());
    }

    #[tokio::test]
    async fn workflow_error_is_converted() {
        let err = run_to_completion(async {
            Err::<(), _>(AppError::Validation("bad input".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), "910");
    }
}
