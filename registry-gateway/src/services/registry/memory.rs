//! In-process registry used by the test suite.
//!
//! Mirrors the registry behaviours the gateway relies on: unique project,
//! user and robot names, one membership per (project, principal), robot
//! secrets generated at creation, and listings in insertion order. Any
//! operation can be made to fail via [`InMemoryRegistry::fail_on`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    NewUser, Project, ProjectMember, ProjectRole, RegistryClient, RegistryError,
    RegistryOperation, Repository, RobotAccount, Tag, UserProfile,
};

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub realname: String,
    pub password: String,
    pub comment: String,
}

#[derive(Debug, Clone)]
struct StoredProject {
    project: Project,
    members: Vec<ProjectMember>,
    repositories: Vec<(Repository, Vec<Tag>)>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    projects: Vec<StoredProject>,
    users: Vec<StoredUser>,
    robots: Vec<RobotAccount>,
    failures: HashMap<RegistryOperation, String>,
    nth_failures: HashMap<RegistryOperation, (usize, String)>,
    calls: Vec<RegistryOperation>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn project_mut(&mut self, name: &str) -> Result<&mut StoredProject, RegistryError> {
        self.projects
            .iter_mut()
            .find(|p| p.project.name == name)
            .ok_or_else(|| RegistryError::NotFound(format!("project {}", name)))
    }

    fn project(&self, name: &str) -> Result<&StoredProject, RegistryError> {
        self.projects
            .iter()
            .find(|p| p.project.name == name)
            .ok_or_else(|| RegistryError::NotFound(format!("project {}", name)))
    }

    fn user_mut(&mut self, user_id: i64) -> Result<&mut StoredUser, RegistryError> {
        self.users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| RegistryError::NotFound(format!("user id {}", user_id)))
    }
}

#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the call and returns the injected failure for it, if any.
    fn enter(&self, operation: RegistryOperation) -> Result<MutexGuard<'_, State>, RegistryError> {
        let mut state = self.lock();
        state.calls.push(operation);
        let nth = state.calls.iter().filter(|op| **op == operation).count();

        let failure = state.failures.get(&operation).cloned().or_else(|| {
            state
                .nth_failures
                .get(&operation)
                .filter(|(n, _)| *n == nth)
                .map(|(_, message)| message.clone())
        });
        if let Some(message) = failure {
            return Err(RegistryError::Api {
                status: 500,
                message,
            });
        }
        Ok(state)
    }

    /// Makes every subsequent call of `operation` fail.
    pub fn fail_on(&self, operation: RegistryOperation, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    /// Makes only the `n`th call (1-based) of `operation` fail.
    pub fn fail_on_call(&self, operation: RegistryOperation, n: usize, message: impl Into<String>) {
        self.lock()
            .nth_failures
            .insert(operation, (n, message.into()));
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<RegistryOperation> {
        self.lock().calls.clone()
    }

    pub fn seed_user(&self, username: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.users.push(StoredUser {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            realname: username.to_string(),
            password: "Passw0rd!".to_string(),
            comment: String::new(),
        });
        id
    }

    /// Inserts a project with the given members (as developers), creating
    /// any missing users.
    pub fn seed_project(&self, name: &str, members: &[&str]) {
        let mut state = self.lock();
        let project_id = state.next_id();
        let mut stored = StoredProject {
            project: Project {
                id: project_id,
                name: name.to_string(),
                public: false,
            },
            members: Vec::new(),
            repositories: Vec::new(),
        };

        for member in members {
            if !state.users.iter().any(|u| u.username == *member) {
                let id = state.next_id();
                state.users.push(StoredUser {
                    id,
                    username: member.to_string(),
                    email: format!("{}@example.com", member),
                    realname: member.to_string(),
                    password: "Passw0rd!".to_string(),
                    comment: String::new(),
                });
            }
            let member_id = state.next_id();
            stored.members.push(ProjectMember {
                id: member_id,
                entity_name: member.to_string(),
                role: Some(ProjectRole::Developer),
            });
        }

        state.projects.push(stored);
    }

    pub fn seed_repository(&self, project: &str, repository: &str, tags: &[&str]) {
        let mut state = self.lock();
        let Ok(stored) = state.project_mut(project) else {
            return;
        };
        let tags = tags
            .iter()
            .enumerate()
            .map(|(i, t)| Tag {
                name: t.to_string(),
                digest: format!("sha256:{:064x}", i),
            })
            .collect::<Vec<_>>();
        stored.repositories.push((
            Repository {
                name: format!("{}/{}", project, repository),
                artifact_count: tags.len() as i64,
            },
            tags,
        ));
    }

    pub fn project_names(&self) -> Vec<String> {
        self.lock()
            .projects
            .iter()
            .map(|p| p.project.name.clone())
            .collect()
    }

    pub fn project(&self, name: &str) -> Option<Project> {
        self.lock().project(name).ok().map(|p| p.project.clone())
    }

    pub fn members_of(&self, project: &str) -> Vec<ProjectMember> {
        self.lock()
            .project(project)
            .map(|p| p.members.clone())
            .unwrap_or_default()
    }

    pub fn robot_names(&self) -> Vec<String> {
        self.lock().robots.iter().map(|r| r.name.clone()).collect()
    }

    pub fn user(&self, username: &str) -> Option<StoredUser> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Checks a robot secret the way the registry would on login.
    pub fn authenticate_robot(&self, name: &str, secret: &str) -> bool {
        self.lock()
            .robots
            .iter()
            .any(|r| r.name == name && r.secret == secret)
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn create_project(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::CreateProject)?;
        if state.projects.iter().any(|p| p.project.name == name) {
            return Err(RegistryError::Conflict(format!(
                "The project named {} already exists",
                name
            )));
        }
        let id = state.next_id();
        state.projects.push(StoredProject {
            project: Project {
                id,
                name: name.to_string(),
                public: false,
            },
            members: Vec::new(),
            repositories: Vec::new(),
        });
        Ok(())
    }

    async fn delete_project(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::DeleteProject)?;
        state.project(name)?;
        state.projects.retain(|p| p.project.name != name);
        Ok(())
    }

    async fn add_project_member(
        &self,
        project: &str,
        principal: &str,
        role: ProjectRole,
    ) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::AddProjectMember)?;
        let known = state.users.iter().any(|u| u.username == principal)
            || state.robots.iter().any(|r| r.name == principal);
        if !known {
            return Err(RegistryError::NotFound(format!("principal {}", principal)));
        }
        let member_id = state.next_id();
        let stored = state.project_mut(project)?;
        if stored.members.iter().any(|m| m.entity_name == principal) {
            return Err(RegistryError::Conflict(format!(
                "{} is already a member of {}",
                principal, project
            )));
        }
        stored.members.push(ProjectMember {
            id: member_id,
            entity_name: principal.to_string(),
            role: Some(role),
        });
        Ok(())
    }

    async fn list_project_members(
        &self,
        project: &str,
    ) -> Result<Vec<ProjectMember>, RegistryError> {
        let state = self.enter(RegistryOperation::ListProjectMembers)?;
        Ok(state.project(project)?.members.clone())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RegistryError> {
        let state = self.enter(RegistryOperation::ListProjects)?;
        Ok(state.projects.iter().map(|p| p.project.clone()).collect())
    }

    async fn create_robot_account(&self, name: &str) -> Result<RobotAccount, RegistryError> {
        let mut state = self.enter(RegistryOperation::CreateRobotAccount)?;
        let full_name = format!("robot${}", name);
        if state.robots.iter().any(|r| r.name == full_name) {
            return Err(RegistryError::Conflict(format!(
                "robot account {} already exists",
                full_name
            )));
        }
        let robot = RobotAccount {
            id: state.next_id(),
            name: full_name,
            secret: Uuid::new_v4().simple().to_string(),
        };
        state.robots.push(robot.clone());
        Ok(robot)
    }

    async fn delete_robot_account_by_name(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::DeleteRobotAccount)?;
        let before = state.robots.len();
        state.robots.retain(|r| r.name != name);
        if state.robots.len() == before {
            return Err(RegistryError::NotFound(format!("robot account {}", name)));
        }
        for project in state.projects.iter_mut() {
            project.members.retain(|m| m.entity_name != name);
        }
        Ok(())
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::CreateUser)?;
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(RegistryError::Conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        let id = state.next_id();
        state.users.push(StoredUser {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            realname: user.realname.clone(),
            password: user.password.clone(),
            comment: user.comment.clone(),
        });
        Ok(())
    }

    async fn get_user_by_name(&self, username: &str) -> Result<i64, RegistryError> {
        let state = self.enter(RegistryOperation::GetUserByName)?;
        state
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .ok_or_else(|| RegistryError::NotFound(format!("user {}", username)))
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::DeleteUser)?;
        let username = state.user_mut(user_id)?.username.clone();
        state.users.retain(|u| u.id != user_id);
        for project in state.projects.iter_mut() {
            project.members.retain(|m| m.entity_name != username);
        }
        Ok(())
    }

    async fn update_user_profile(
        &self,
        user_id: i64,
        profile: &UserProfile,
    ) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::UpdateUserProfile)?;
        let user = state.user_mut(user_id)?;
        if let Some(email) = &profile.email {
            user.email = email.clone();
        }
        if let Some(realname) = &profile.realname {
            user.realname = realname.clone();
        }
        if let Some(comment) = &profile.comment {
            user.comment = comment.clone();
        }
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::UpdateUserPassword)?;
        let user = state.user_mut(user_id)?;
        if user.password != old_password {
            return Err(RegistryError::Forbidden(
                "old password is not correct".to_string(),
            ));
        }
        user.password = new_password.to_string();
        Ok(())
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, RegistryError> {
        let state = self.enter(RegistryOperation::ListRepositories)?;
        Ok(state
            .project(project)?
            .repositories
            .iter()
            .map(|(r, _)| r.clone())
            .collect())
    }

    async fn list_tags(&self, project: &str, repository: &str) -> Result<Vec<Tag>, RegistryError> {
        let state = self.enter(RegistryOperation::ListTags)?;
        let full_name = format!("{}/{}", project, repository);
        state
            .project(project)?
            .repositories
            .iter()
            .find(|(r, _)| r.name == full_name)
            .map(|(_, tags)| tags.clone())
            .ok_or_else(|| RegistryError::NotFound(format!("repository {}", full_name)))
    }

    async fn delete_repository(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<(), RegistryError> {
        let mut state = self.enter(RegistryOperation::DeleteRepository)?;
        let full_name = format!("{}/{}", project, repository);
        let stored = state.project_mut(project)?;
        let before = stored.repositories.len();
        stored.repositories.retain(|(r, _)| r.name != full_name);
        if stored.repositories.len() == before {
            return Err(RegistryError::NotFound(format!("repository {}", full_name)));
        }
        Ok(())
    }
}
