use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{OkResponse, RepositoryListResponse, TagListResponse},
    services::{ErrorCode, RegistryResultExt},
    AppState,
};

pub async fn list_repositories(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<RepositoryListResponse>, AppError> {
    let images = state
        .catalog
        .repositories(&project)
        .await
        .or_code(ErrorCode::RepositoryListing)?;

    Ok(Json(RepositoryListResponse { images }))
}

pub async fn list_tags(
    State(state): State<AppState>,
    Path((project, repository)): Path<(String, String)>,
) -> Result<Json<TagListResponse>, AppError> {
    let tags = state
        .catalog
        .tags(&project, &repository)
        .await
        .or_code(ErrorCode::TagListing)?;

    Ok(Json(TagListResponse {
        project,
        repository,
        tags,
    }))
}

pub async fn delete_repository(
    State(state): State<AppState>,
    Path((project, repository)): Path<(String, String)>,
) -> Result<Json<OkResponse>, AppError> {
    tracing::info!(project = %project, repository = %repository, "Deleting repository");

    state
        .catalog
        .delete_repository(&project, &repository)
        .await
        .or_code(ErrorCode::RepositoryDeletion)?;

    Ok(Json(OkResponse::ok()))
}
