//! User account pass-throughs.
//!
//! The registry addresses users by numeric id, so every operation other
//! than creation resolves the username first.

use std::sync::Arc;

use crate::services::registry::{NewUser, RegistryClient, RegistryError, UserProfile};

#[derive(Clone)]
pub struct AccountService {
    registry: Arc<dyn RegistryClient>,
}

impl AccountService {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<(), RegistryError> {
        self.registry.create_user(user).await?;
        tracing::info!(username = %user.username, "User created");
        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), RegistryError> {
        let user_id = self.registry.get_user_by_name(username).await?;
        self.registry.delete_user(user_id).await?;
        tracing::info!(username = %username, user_id, "User deleted");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        username: &str,
        profile: &UserProfile,
    ) -> Result<(), RegistryError> {
        let user_id = self.registry.get_user_by_name(username).await?;
        self.registry.update_user_profile(user_id, profile).await
    }

    pub async fn update_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        let user_id = self.registry.get_user_by_name(username).await?;
        self.registry
            .update_user_password(user_id, old_password, new_password)
            .await?;
        tracing::info!(username = %username, "User password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::{InMemoryRegistry, RegistryOperation};

    #[tokio::test]
    async fn unknown_user_stops_before_delete() {
        let registry = Arc::new(InMemoryRegistry::new());
        let accounts = AccountService::new(registry.clone());

        let err = accounts.delete_user("ghost").await.unwrap_err();

        assert!(matches!(err, RegistryError::NotFound(_)));
        assert_eq!(registry.calls(), vec![RegistryOperation::GetUserByName]);
    }

    #[tokio::test]
    async fn profile_update_only_touches_given_fields() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.seed_user("alice");
        let accounts = AccountService::new(registry.clone());

        accounts
            .update_profile(
                "alice",
                &UserProfile {
                    realname: Some("Alice Liddell".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let user = registry.user("alice").unwrap();
        assert_eq!(user.realname, "Alice Liddell");
        assert_eq!(user.email, "alice@example.com");
    }
}
