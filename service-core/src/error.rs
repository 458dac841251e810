//! JSON error envelope shared by gateway handlers.
//!
//! Every failed request produces exactly one body of the form
//! `{"code": "...", "detail": "..."}`. The code is a stable, documented
//! string chosen by the service; the HTTP status follows the error class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code reported for request payloads that fail binding or validation.
pub const VALIDATION_CODE: &str = "910";

/// Code reported for failures inside the gateway itself.
pub const INTERNAL_CODE: &str = "900";

/// Wire shape of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Request was rejected before any side effect took place.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A call to an upstream dependency failed.
    #[error("Upstream error [{code}]: {detail}")]
    Upstream { code: &'static str, detail: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(code: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            code,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AppError::Validation(_) => VALIDATION_CODE,
            AppError::Upstream { code, .. } => code,
            AppError::InternalError(_) => INTERNAL_CODE,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Validation(detail) | AppError::Upstream { detail, .. } => detail.clone(),
            AppError::InternalError(err) => format!("{:#}", err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = %self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = %self.code(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            code: self.code().to_string(),
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_bad_request_with_code_910() {
        let (status, body) = body_of(AppError::Validation("user_name: required".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "910");
        assert_eq!(body.detail, "user_name: required");
    }

    #[tokio::test]
    async fn upstream_keeps_operation_code() {
        let (status, body) = body_of(AppError::upstream("902", "member add refused")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "902");
        assert_eq!(body.detail, "member add refused");
    }

    #[tokio::test]
    async fn internal_error_uses_generic_code() {
        let (status, body) =
            body_of(AppError::InternalError(anyhow::anyhow!("task panicked"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, INTERNAL_CODE);
        assert!(body.detail.contains("task panicked"));
    }
}
