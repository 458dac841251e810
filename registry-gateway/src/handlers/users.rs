use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateUserRequest, OkResponse, UpdatePasswordRequest, UpdateProfileRequest},
    services::{registry::NewUser, ErrorCode, RegistryResultExt},
    utils::ValidatedJson,
    AppState,
};

pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<OkResponse>), AppError> {
    let user = NewUser::from(payload);
    tracing::info!(username = %user.username, "Creating user");

    state
        .accounts
        .create_user(&user)
        .await
        .or_code(ErrorCode::UserCreation)?;

    Ok((StatusCode::CREATED, Json(OkResponse::ok())))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    tracing::info!(username = %username, "Deleting user");

    state
        .accounts
        .delete_user(&username)
        .await
        .or_code(ErrorCode::UserDeletion)?;

    Ok(Json(OkResponse::ok()))
}

pub async fn update_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .accounts
        .update_password(
            &payload.username,
            &payload.old_password,
            &payload.new_password,
        )
        .await
        .or_code(ErrorCode::PasswordUpdate)?;

    Ok(Json(OkResponse::ok()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .accounts
        .update_profile(&payload.username, &payload.profile())
        .await
        .or_code(ErrorCode::ProfileUpdate)?;

    Ok(Json(OkResponse::ok()))
}
