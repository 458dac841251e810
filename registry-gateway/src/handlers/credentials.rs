use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{dtos::CredentialResponse, handlers::run_to_completion, AppState};

/// Issues a robot credential with developer access to `project`.
///
/// The secret is returned in this response only; it cannot be read back.
pub async fn issue_credential(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<CredentialResponse>, AppError> {
    let provisioning = state.provisioning.clone();
    let credential =
        run_to_completion(async move { provisioning.issue_robot_credential(&project).await })
            .await?;

    Ok(Json(CredentialResponse::from(credential)))
}
