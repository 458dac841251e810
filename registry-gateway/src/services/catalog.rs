//! Project and repository pass-throughs: one registry call each.

use std::sync::Arc;

use crate::services::registry::{RegistryClient, RegistryError};

#[derive(Clone)]
pub struct CatalogService {
    registry: Arc<dyn RegistryClient>,
}

impl CatalogService {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    pub async fn delete_project(&self, project: &str) -> Result<(), RegistryError> {
        self.registry.delete_project(project).await?;
        tracing::info!(project = %project, "Project deleted");
        Ok(())
    }

    /// Repository names as the registry reports them (`project/repo`).
    pub async fn repositories(&self, project: &str) -> Result<Vec<String>, RegistryError> {
        let repositories = self.registry.list_repositories(project).await?;
        Ok(repositories.into_iter().map(|r| r.name).collect())
    }

    pub async fn tags(&self, project: &str, repository: &str) -> Result<Vec<String>, RegistryError> {
        let tags = self.registry.list_tags(project, repository).await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    pub async fn delete_repository(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<(), RegistryError> {
        self.registry.delete_repository(project, repository).await?;
        tracing::info!(project = %project, repository = %repository, "Repository deleted");
        Ok(())
    }
}
