use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::registry::{NewUser, UserProfile};
use crate::services::RobotCredential;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "project_name is required"))]
    pub project_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "user_name is required"))]
    pub user_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    /// Accepts the historical `readname` spelling as well.
    #[serde(default, alias = "readname")]
    #[validate(length(min = 1, message = "realname is required"))]
    pub realname: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default, alias = "comment")]
    #[validate(length(min = 1, message = "comments is required"))]
    pub comments: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser {
            username: req.username,
            email: req.email,
            realname: req.realname,
            password: req.password,
            comment: req.comments,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "old_password is required"))]
    pub old_password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "new_password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    pub comment: Option<String>,
    pub email: Option<String>,
    pub realname: Option<String>,
}

impl UpdateProfileRequest {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            realname: self.realname.clone(),
            comment: self.comment.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepositoryListResponse {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagListResponse {
    pub project: String,
    pub repository: String,
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CredentialResponse {
    pub name: String,
    pub password: String,
    pub project_name: String,
}

impl From<RobotCredential> for CredentialResponse {
    fn from(credential: RobotCredential) -> Self {
        Self {
            name: credential.name,
            password: credential.secret,
            project_name: credential.project,
        }
    }
}
