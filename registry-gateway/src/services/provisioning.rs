//! Multi-step provisioning workflows.
//!
//! Both workflows issue their registry calls strictly in sequence. Project
//! creation does not undo the project when the owner grant fails; robot
//! credential issuance deletes the robot account when its grant fails.
//! Concurrent invocations are not serialised here: duplicate names are
//! rejected by the registry's own uniqueness checks.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ProvisioningSettings;
use crate::services::metrics::record_compensation;
use crate::services::registry::{ProjectRole, RegistryClient, RegistryError};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("failed to create project {project}: {source}")]
    ProjectCreation {
        project: String,
        source: RegistryError,
    },

    #[error("failed to add {owner} as admin of project {project}: {source}")]
    OwnerMembership {
        project: String,
        owner: String,
        source: RegistryError,
    },

    #[error("failed to create robot account {robot}: {source}")]
    RobotCreation { robot: String, source: RegistryError },

    #[error(
        "failed to grant {robot} developer access to project {project}: {source}{}",
        .rollback.as_ref().map(|e| format!("; robot account rollback failed: {}", e)).unwrap_or_default()
    )]
    RobotMembership {
        project: String,
        robot: String,
        source: RegistryError,
        /// Error of the compensating delete, when it also failed.
        rollback: Option<RegistryError>,
    },
}

/// Credential handed back to the caller once. Nothing here is persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct RobotCredential {
    pub name: String,
    pub secret: String,
    pub project: String,
}

impl std::fmt::Debug for RobotCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotCredential")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .field("project", &self.project)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProvisioningService {
    registry: Arc<dyn RegistryClient>,
    robot_name_prefix: String,
}

impl ProvisioningService {
    pub fn new(registry: Arc<dyn RegistryClient>, settings: &ProvisioningSettings) -> Self {
        Self {
            registry,
            robot_name_prefix: settings.robot_name_prefix.clone(),
        }
    }

    /// Creates a private project and makes `owner` its admin.
    ///
    /// If the owner grant fails the project stays in the registry without an
    /// admin member; the error names the failing step so it can be fixed by
    /// hand.
    pub async fn create_project(&self, project: &str, owner: &str) -> Result<(), ProvisioningError> {
        tracing::info!(project = %project, owner = %owner, "Creating project");

        self.registry
            .create_project(project)
            .await
            .map_err(|source| ProvisioningError::ProjectCreation {
                project: project.to_string(),
                source,
            })?;

        if let Err(source) = self
            .registry
            .add_project_member(project, owner, ProjectRole::ProjectAdmin)
            .await
        {
            tracing::warn!(
                project = %project,
                owner = %owner,
                error = %source,
                "Owner grant failed; project left in place without an admin member"
            );
            return Err(ProvisioningError::OwnerMembership {
                project: project.to_string(),
                owner: owner.to_string(),
                source,
            });
        }

        tracing::info!(project = %project, owner = %owner, "Project created");
        Ok(())
    }

    /// Creates a robot account and grants it developer access to `project`.
    ///
    /// When the grant fails the robot account is deleted before the grant
    /// error is returned. A failed delete is logged and counted, and carried
    /// in the returned error.
    pub async fn issue_robot_credential(
        &self,
        project: &str,
    ) -> Result<RobotCredential, ProvisioningError> {
        let requested = self.robot_name(project);
        tracing::info!(project = %project, robot = %requested, "Issuing robot credential");

        let robot = self
            .registry
            .create_robot_account(&requested)
            .await
            .map_err(|source| ProvisioningError::RobotCreation {
                robot: requested.clone(),
                source,
            })?;

        if let Err(source) = self
            .registry
            .add_project_member(project, &robot.name, ProjectRole::Developer)
            .await
        {
            tracing::warn!(
                project = %project,
                robot = %robot.name,
                error = %source,
                "Robot grant failed; deleting robot account"
            );

            let rollback = self
                .registry
                .delete_robot_account_by_name(&robot.name)
                .await
                .err();
            record_compensation(rollback.is_none());

            match &rollback {
                None => tracing::info!(robot = %robot.name, "Robot account rolled back"),
                Some(e) => tracing::error!(
                    project = %project,
                    robot = %robot.name,
                    error = %e,
                    "Compensating delete failed; robot account left behind"
                ),
            }

            return Err(ProvisioningError::RobotMembership {
                project: project.to_string(),
                robot: robot.name,
                source,
                rollback,
            });
        }

        tracing::info!(project = %project, robot = %robot.name, "Robot credential issued");

        Ok(RobotCredential {
            name: robot.name,
            secret: robot.secret,
            project: project.to_string(),
        })
    }

    fn robot_name(&self, project: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}-{}", self.robot_name_prefix, project, &suffix[..8])
    }
}
