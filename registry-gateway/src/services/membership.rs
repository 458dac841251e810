//! Which projects can a user see?
//!
//! The registry has no "projects of user" query for arbitrary users, so the
//! filter lists every project and then fetches each project's members, one
//! project at a time. That is one registry call per project (plus member
//! pagination), so the cost grows with the size of the registry.
//!
//! The result is a point-in-time read: a membership change racing with the
//! scan may or may not be reflected.

use std::sync::Arc;

use crate::services::registry::{RegistryClient, RegistryError};

#[derive(Clone)]
pub struct MembershipFilter {
    registry: Arc<dyn RegistryClient>,
}

impl MembershipFilter {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Names of the projects where `username` is a member, in the
    /// registry's listing order. Any failed call fails the whole scan.
    pub async fn accessible_projects(&self, username: &str) -> Result<Vec<String>, RegistryError> {
        let projects = self.registry.list_projects().await?;
        tracing::debug!(
            username = %username,
            project_count = projects.len(),
            "Scanning project memberships"
        );

        let mut accessible = Vec::new();
        for project in projects {
            let members = self.registry.list_project_members(&project.name).await?;
            if members.iter().any(|m| m.entity_name == username) {
                accessible.push(project.name);
            }
        }

        tracing::info!(
            username = %username,
            matched = accessible.len(),
            "Resolved accessible projects"
        );
        Ok(accessible)
    }
}
