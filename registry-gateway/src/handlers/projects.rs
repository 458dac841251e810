use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateProjectRequest, OkResponse, ProjectListResponse},
    handlers::run_to_completion,
    services::{ErrorCode, RegistryResultExt},
    utils::ValidatedJson,
    AppState,
};

/// Creates a private project owned by `user_name`.
pub async fn create_project(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<OkResponse>), AppError> {
    let provisioning = state.provisioning.clone();
    run_to_completion(async move {
        provisioning
            .create_project(&payload.project_name, &payload.user_name)
            .await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(OkResponse::ok())))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    tracing::info!(project = %project, "Deleting project");

    state
        .catalog
        .delete_project(&project)
        .await
        .or_code(ErrorCode::ProjectDeletion)?;

    Ok(Json(OkResponse::ok()))
}

/// Lists the projects the user in the path is a member of.
///
/// The path segment shares its name with the project routes; here it holds
/// a username.
pub async fn list_accessible_projects(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let projects = state
        .membership
        .accessible_projects(&username)
        .await
        .or_code(ErrorCode::AccessibleProjects)?;

    Ok(Json(ProjectListResponse { projects }))
}
