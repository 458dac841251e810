//! Boundary to the registry's administrative API.
//!
//! The gateway never talks to the registry except through [`RegistryClient`].
//! Every method is a single awaited round trip (paginated listings excepted)
//! that either succeeds or reports the registry's error.

pub mod harbor;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use harbor::HarborClient;
pub use memory::InMemoryRegistry;

/// Error reported by a registry call.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("registry returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Project roles as numbered by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectRole {
    ProjectAdmin,
    Developer,
    Guest,
    Maintainer,
    LimitedGuest,
}

impl ProjectRole {
    pub fn id(self) -> i64 {
        match self {
            ProjectRole::ProjectAdmin => 1,
            ProjectRole::Developer => 2,
            ProjectRole::Guest => 3,
            ProjectRole::Maintainer => 4,
            ProjectRole::LimitedGuest => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(ProjectRole::ProjectAdmin),
            2 => Some(ProjectRole::Developer),
            3 => Some(ProjectRole::Guest),
            4 => Some(ProjectRole::Maintainer),
            5 => Some(ProjectRole::LimitedGuest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub public: bool,
}

/// A (project, principal, role) grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMember {
    pub id: i64,
    pub entity_name: String,
    pub role: Option<ProjectRole>,
}

/// A freshly created robot account. The secret is only ever returned here.
#[derive(Clone, PartialEq, Eq)]
pub struct RobotAccount {
    pub id: i64,
    pub name: String,
    pub secret: String,
}

impl std::fmt::Debug for RobotAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotAccount")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub realname: String,
    pub password: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub email: Option<String>,
    pub realname: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub artifact_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub digest: String,
}

/// Registry operations, used for logging, metrics and test fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOperation {
    CreateProject,
    DeleteProject,
    AddProjectMember,
    ListProjectMembers,
    ListProjects,
    CreateRobotAccount,
    DeleteRobotAccount,
    CreateUser,
    GetUserByName,
    DeleteUser,
    UpdateUserProfile,
    UpdateUserPassword,
    ListRepositories,
    ListTags,
    DeleteRepository,
}

impl RegistryOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistryOperation::CreateProject => "create_project",
            RegistryOperation::DeleteProject => "delete_project",
            RegistryOperation::AddProjectMember => "add_project_member",
            RegistryOperation::ListProjectMembers => "list_project_members",
            RegistryOperation::ListProjects => "list_projects",
            RegistryOperation::CreateRobotAccount => "create_robot_account",
            RegistryOperation::DeleteRobotAccount => "delete_robot_account",
            RegistryOperation::CreateUser => "create_user",
            RegistryOperation::GetUserByName => "get_user_by_name",
            RegistryOperation::DeleteUser => "delete_user",
            RegistryOperation::UpdateUserProfile => "update_user_profile",
            RegistryOperation::UpdateUserPassword => "update_user_password",
            RegistryOperation::ListRepositories => "list_repositories",
            RegistryOperation::ListTags => "list_tags",
            RegistryOperation::DeleteRepository => "delete_repository",
        }
    }
}

impl std::fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative operations the gateway needs from the registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Creates a private project.
    async fn create_project(&self, name: &str) -> Result<(), RegistryError>;

    async fn delete_project(&self, name: &str) -> Result<(), RegistryError>;

    async fn add_project_member(
        &self,
        project: &str,
        principal: &str,
        role: ProjectRole,
    ) -> Result<(), RegistryError>;

    /// All members of a project, across every page.
    async fn list_project_members(&self, project: &str)
        -> Result<Vec<ProjectMember>, RegistryError>;

    /// All projects in the registry's listing order.
    async fn list_projects(&self) -> Result<Vec<Project>, RegistryError>;

    async fn create_robot_account(&self, name: &str) -> Result<RobotAccount, RegistryError>;

    async fn delete_robot_account_by_name(&self, name: &str) -> Result<(), RegistryError>;

    async fn create_user(&self, user: &NewUser) -> Result<(), RegistryError>;

    /// Resolves a username to the registry's numeric user id.
    async fn get_user_by_name(&self, username: &str) -> Result<i64, RegistryError>;

    async fn delete_user(&self, user_id: i64) -> Result<(), RegistryError>;

    async fn update_user_profile(
        &self,
        user_id: i64,
        profile: &UserProfile,
    ) -> Result<(), RegistryError>;

    async fn update_user_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError>;

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, RegistryError>;

    async fn list_tags(&self, project: &str, repository: &str) -> Result<Vec<Tag>, RegistryError>;

    async fn delete_repository(&self, project: &str, repository: &str)
        -> Result<(), RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip_through_registry_numbering() {
        assert_eq!(ProjectRole::ProjectAdmin.id(), 1);
        assert_eq!(ProjectRole::Developer.id(), 2);
        assert_eq!(ProjectRole::from_id(2), Some(ProjectRole::Developer));
        assert_eq!(ProjectRole::from_id(42), None);
    }

    #[test]
    fn robot_secret_is_redacted_in_debug_output() {
        let robot = RobotAccount {
            id: 7,
            name: "robot$ci".to_string(),
            secret: "s3cr3t".to_string(),
        };

        let rendered = format!("{:?}", robot);
        assert!(rendered.contains("robot$ci"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
