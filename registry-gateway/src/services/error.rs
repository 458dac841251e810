//! Stable error codes reported in the `{code, detail}` response body.
//!
//! Each failing step has its own code so callers can tell, for example, a
//! refused project creation (901) from a refused owner grant (902).

use service_core::error::AppError;

use crate::services::provisioning::ProvisioningError;
use crate::services::registry::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ProjectCreation,
    OwnerMembership,
    ProjectDeletion,
    AccessibleProjects,
    RepositoryListing,
    RepositoryDeletion,
    TagListing,
    UserCreation,
    UserDeletion,
    PasswordUpdate,
    ProfileUpdate,
    RobotCreation,
    RobotMembership,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ProjectCreation => "901",
            ErrorCode::OwnerMembership => "902",
            ErrorCode::ProjectDeletion => "903",
            ErrorCode::AccessibleProjects => "904",
            ErrorCode::RepositoryListing => "905",
            ErrorCode::RepositoryDeletion => "906",
            ErrorCode::TagListing => "907",
            ErrorCode::UserCreation => "911",
            ErrorCode::UserDeletion => "912",
            ErrorCode::PasswordUpdate => "913",
            ErrorCode::ProfileUpdate => "914",
            ErrorCode::RobotCreation => "920",
            ErrorCode::RobotMembership => "921",
        }
    }
}

/// Tags a registry failure with the code of the step that produced it.
pub trait RegistryResultExt<T> {
    fn or_code(self, code: ErrorCode) -> Result<T, AppError>;
}

impl<T> RegistryResultExt<T> for Result<T, RegistryError> {
    fn or_code(self, code: ErrorCode) -> Result<T, AppError> {
        self.map_err(|e| AppError::upstream(code.as_str(), e))
    }
}

impl From<ProvisioningError> for AppError {
    fn from(err: ProvisioningError) -> Self {
        let code = match &err {
            ProvisioningError::ProjectCreation { .. } => ErrorCode::ProjectCreation,
            ProvisioningError::OwnerMembership { .. } => ErrorCode::OwnerMembership,
            ProvisioningError::RobotCreation { .. } => ErrorCode::RobotCreation,
            ProvisioningError::RobotMembership { .. } => ErrorCode::RobotMembership,
        };
        AppError::upstream(code.as_str(), err)
    }
}
