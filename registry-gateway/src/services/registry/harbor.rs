//! Harbor v2.0 REST implementation of [`RegistryClient`].
//!
//! One pooled `reqwest::Client` is shared by every request; each call
//! authenticates with the administrative principal via HTTP basic auth.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use service_core::observability::TraceContextExt;
use std::time::Instant;

use super::{
    NewUser, Project, ProjectMember, ProjectRole, RegistryClient, RegistryError,
    RegistryOperation, Repository, RobotAccount, Tag, UserProfile,
};
use crate::config::RegistrySettings;
use crate::services::metrics::record_registry_call;

const API_PREFIX: &str = "/api/v2.0";
const PAGE_SIZE: usize = 100;
const RESOURCE_NAME_HEADER: &str = "X-Is-Resource-Name";
const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Clone)]
pub struct HarborClient {
    client: Client,
    api_base: String,
    username: String,
    password: Secret<String>,
}

#[derive(Serialize)]
struct ProjectReq<'a> {
    project_name: &'a str,
    metadata: ProjectMetadataReq,
}

#[derive(Serialize)]
struct ProjectMetadataReq {
    public: &'static str,
}

#[derive(Deserialize)]
struct ProjectDto {
    project_id: i64,
    name: String,
    #[serde(default)]
    metadata: Option<ProjectMetadataDto>,
}

#[derive(Deserialize)]
struct ProjectMetadataDto {
    public: Option<String>,
}

#[derive(Serialize)]
struct MemberReq<'a> {
    role_id: i64,
    member_user: MemberUser<'a>,
}

#[derive(Serialize)]
struct MemberUser<'a> {
    username: &'a str,
}

#[derive(Deserialize)]
struct MemberDto {
    id: i64,
    entity_name: String,
    #[serde(default)]
    role_id: Option<i64>,
}

#[derive(Serialize)]
struct RobotReq<'a> {
    name: &'a str,
    description: &'static str,
    level: &'static str,
    duration: i64,
    disable: bool,
    permissions: Vec<RobotPermission>,
}

/// Harbor refuses a robot with no permissions. Project access comes from the
/// developer membership granted afterwards, so the robot itself only gets
/// the system-wide right to list projects.
#[derive(Serialize)]
struct RobotPermission {
    kind: &'static str,
    namespace: &'static str,
    access: Vec<RobotAccess>,
}

#[derive(Serialize)]
struct RobotAccess {
    resource: &'static str,
    action: &'static str,
}

impl RobotPermission {
    fn list_projects() -> Self {
        Self {
            kind: "system",
            namespace: "/",
            access: vec![RobotAccess {
                resource: "project",
                action: "list",
            }],
        }
    }
}

#[derive(Deserialize)]
struct RobotCreatedDto {
    id: i64,
    name: String,
    secret: String,
}

#[derive(Deserialize)]
struct RobotDto {
    id: i64,
    name: String,
}

#[derive(Serialize)]
struct UserReq<'a> {
    username: &'a str,
    email: &'a str,
    realname: &'a str,
    password: &'a str,
    comment: &'a str,
}

#[derive(Deserialize)]
struct UserDto {
    user_id: i64,
    username: String,
}

#[derive(Serialize)]
struct UserProfileReq<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Serialize)]
struct PasswordReq<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Deserialize)]
struct RepositoryDto {
    name: String,
    #[serde(default)]
    artifact_count: i64,
}

#[derive(Deserialize)]
struct ArtifactDto {
    digest: String,
    #[serde(default)]
    tags: Option<Vec<TagDto>>,
}

#[derive(Deserialize)]
struct TagDto {
    name: String,
}

#[derive(Deserialize)]
struct HarborErrors {
    #[serde(default)]
    errors: Vec<HarborErrorDetail>,
}

#[derive(Deserialize)]
struct HarborErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HarborClient {
    pub fn new(settings: &RegistrySettings) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base(&settings.url),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .with_trace_context()
    }

    async fn send(
        &self,
        operation: RegistryOperation,
        request: RequestBuilder,
    ) -> Result<Response, RegistryError> {
        let started = Instant::now();

        let result = match request.send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(error_from_response(response).await),
            Err(e) => Err(RegistryError::Transport(e)),
        };

        record_registry_call(operation, result.is_ok(), started.elapsed());

        match &result {
            Ok(response) => tracing::debug!(
                operation = %operation,
                status = %response.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Registry call succeeded"
            ),
            Err(e) => tracing::warn!(
                operation = %operation,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Registry call failed"
            ),
        }

        result
    }

    async fn execute(
        &self,
        operation: RegistryOperation,
        request: RequestBuilder,
    ) -> Result<(), RegistryError> {
        self.send(operation, request).await.map(|_| ())
    }

    /// Walks `page`/`page_size` until the reported total is reached or a
    /// short page comes back.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        operation: RegistryOperation,
        path: &str,
        query: &[(&str, String)],
        by_name: bool,
    ) -> Result<Vec<T>, RegistryError> {
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let mut request = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("page", page), ("page_size", PAGE_SIZE)]);
            if by_name {
                request = request.header(RESOURCE_NAME_HEADER, "true");
            }

            let response = self.send(operation, request).await?;
            let total = response
                .headers()
                .get(TOTAL_COUNT_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());

            let batch: Vec<T> = decode::<Option<Vec<T>>>(response).await?.unwrap_or_default();
            let fetched = batch.len();
            items.extend(batch);

            let reached_total = total.is_some_and(|total| items.len() >= total);
            if reached_total || fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl RegistryClient for HarborClient {
    async fn create_project(&self, name: &str) -> Result<(), RegistryError> {
        let body = ProjectReq {
            project_name: name,
            metadata: ProjectMetadataReq { public: "false" },
        };

        self.execute(
            RegistryOperation::CreateProject,
            self.request(Method::POST, "/projects").json(&body),
        )
        .await
    }

    async fn delete_project(&self, name: &str) -> Result<(), RegistryError> {
        self.execute(
            RegistryOperation::DeleteProject,
            self.request(Method::DELETE, &project_path(name))
                .header(RESOURCE_NAME_HEADER, "true"),
        )
        .await
    }

    async fn add_project_member(
        &self,
        project: &str,
        principal: &str,
        role: ProjectRole,
    ) -> Result<(), RegistryError> {
        let body = MemberReq {
            role_id: role.id(),
            member_user: MemberUser {
                username: principal,
            },
        };

        self.execute(
            RegistryOperation::AddProjectMember,
            self.request(Method::POST, &format!("{}/members", project_path(project)))
                .header(RESOURCE_NAME_HEADER, "true")
                .json(&body),
        )
        .await
    }

    async fn list_project_members(
        &self,
        project: &str,
    ) -> Result<Vec<ProjectMember>, RegistryError> {
        let members: Vec<MemberDto> = self
            .fetch_all(
                RegistryOperation::ListProjectMembers,
                &format!("{}/members", project_path(project)),
                &[],
                true,
            )
            .await?;

        Ok(members
            .into_iter()
            .map(|m| ProjectMember {
                id: m.id,
                entity_name: m.entity_name,
                role: m.role_id.and_then(ProjectRole::from_id),
            })
            .collect())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RegistryError> {
        let projects: Vec<ProjectDto> = self
            .fetch_all(RegistryOperation::ListProjects, "/projects", &[], false)
            .await?;

        Ok(projects
            .into_iter()
            .map(|p| Project {
                id: p.project_id,
                public: p
                    .metadata
                    .and_then(|m| m.public)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true")),
                name: p.name,
            })
            .collect())
    }

    async fn create_robot_account(&self, name: &str) -> Result<RobotAccount, RegistryError> {
        let body = RobotReq {
            name,
            description: "issued by registry-gateway",
            level: "system",
            duration: -1,
            disable: false,
            permissions: vec![RobotPermission::list_projects()],
        };

        let response = self
            .send(
                RegistryOperation::CreateRobotAccount,
                self.request(Method::POST, "/robots").json(&body),
            )
            .await?;
        let created: RobotCreatedDto = decode(response).await?;

        Ok(RobotAccount {
            id: created.id,
            name: created.name,
            secret: created.secret,
        })
    }

    async fn delete_robot_account_by_name(&self, name: &str) -> Result<(), RegistryError> {
        // Creation reports the prefixed name (`robot$...`); lookups use the bare one.
        let bare = name.rsplit('$').next().unwrap_or(name);

        let robots: Vec<RobotDto> = self
            .fetch_all(
                RegistryOperation::DeleteRobotAccount,
                "/robots",
                &[("q", format!("name={}", bare))],
                false,
            )
            .await?;

        let robot = robots
            .into_iter()
            .find(|r| r.name == name || r.name == bare)
            .ok_or_else(|| RegistryError::NotFound(format!("robot account {}", name)))?;

        self.execute(
            RegistryOperation::DeleteRobotAccount,
            self.request(Method::DELETE, &format!("/robots/{}", robot.id)),
        )
        .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), RegistryError> {
        let body = UserReq {
            username: &user.username,
            email: &user.email,
            realname: &user.realname,
            password: &user.password,
            comment: &user.comment,
        };

        self.execute(
            RegistryOperation::CreateUser,
            self.request(Method::POST, "/users").json(&body),
        )
        .await
    }

    async fn get_user_by_name(&self, username: &str) -> Result<i64, RegistryError> {
        let users: Vec<UserDto> = self
            .fetch_all(
                RegistryOperation::GetUserByName,
                "/users",
                &[("q", format!("username={}", username))],
                false,
            )
            .await?;

        users
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| u.user_id)
            .ok_or_else(|| RegistryError::NotFound(format!("user {}", username)))
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), RegistryError> {
        self.execute(
            RegistryOperation::DeleteUser,
            self.request(Method::DELETE, &format!("/users/{}", user_id)),
        )
        .await
    }

    async fn update_user_profile(
        &self,
        user_id: i64,
        profile: &UserProfile,
    ) -> Result<(), RegistryError> {
        let body = UserProfileReq {
            email: profile.email.as_deref(),
            realname: profile.realname.as_deref(),
            comment: profile.comment.as_deref(),
        };

        self.execute(
            RegistryOperation::UpdateUserProfile,
            self.request(Method::PUT, &format!("/users/{}", user_id))
                .json(&body),
        )
        .await
    }

    async fn update_user_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        let body = PasswordReq {
            old_password,
            new_password,
        };

        self.execute(
            RegistryOperation::UpdateUserPassword,
            self.request(Method::PUT, &format!("/users/{}/password", user_id))
                .json(&body),
        )
        .await
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, RegistryError> {
        let repositories: Vec<RepositoryDto> = self
            .fetch_all(
                RegistryOperation::ListRepositories,
                &format!("{}/repositories", project_path(project)),
                &[],
                false,
            )
            .await?;

        Ok(repositories
            .into_iter()
            .map(|r| Repository {
                name: r.name,
                artifact_count: r.artifact_count,
            })
            .collect())
    }

    async fn list_tags(&self, project: &str, repository: &str) -> Result<Vec<Tag>, RegistryError> {
        let artifacts: Vec<ArtifactDto> = self
            .fetch_all(
                RegistryOperation::ListTags,
                &format!("{}/artifacts", repository_path(project, repository)),
                &[("with_tag", "true".to_string())],
                false,
            )
            .await?;

        Ok(artifacts
            .into_iter()
            .flat_map(|artifact| {
                let digest = artifact.digest;
                artifact
                    .tags
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |tag| Tag {
                        name: tag.name,
                        digest: digest.clone(),
                    })
            })
            .collect())
    }

    async fn delete_repository(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<(), RegistryError> {
        self.execute(
            RegistryOperation::DeleteRepository,
            self.request(Method::DELETE, &repository_path(project, repository)),
        )
        .await
    }
}

fn api_base(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(API_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PREFIX)
    }
}

fn project_path(project: &str) -> String {
    format!("/projects/{}", urlencoding::encode(project))
}

/// Repository names go into the path double-encoded, so `team/app` becomes
/// `team%252Fapp`.
fn repository_path(project: &str, repository: &str) -> String {
    let encoded = urlencoding::encode(repository);
    format!(
        "{}/repositories/{}",
        project_path(project),
        urlencoding::encode(&encoded)
    )
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RegistryError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))
}

async fn error_from_response(response: Response) -> RegistryError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<HarborErrors>(&body)
        .ok()
        .filter(|e| !e.errors.is_empty())
        .map(|e| {
            e.errors
                .iter()
                .map(|d| {
                    if d.code.is_empty() {
                        d.message.clone()
                    } else {
                        format!("{}: {}", d.code, d.message)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match status {
        StatusCode::CONFLICT => RegistryError::Conflict(message),
        StatusCode::NOT_FOUND => RegistryError::NotFound(message),
        StatusCode::UNAUTHORIZED => RegistryError::Unauthorized(message),
        StatusCode::FORBIDDEN => RegistryError::Forbidden(message),
        _ => RegistryError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_is_appended_once() {
        assert_eq!(
            api_base("https://harbor.internal"),
            "https://harbor.internal/api/v2.0"
        );
        assert_eq!(
            api_base("https://harbor.internal/"),
            "https://harbor.internal/api/v2.0"
        );
        assert_eq!(
            api_base("https://harbor.internal/api/v2.0/"),
            "https://harbor.internal/api/v2.0"
        );
    }

    #[test]
    fn nested_repository_names_are_double_encoded() {
        assert_eq!(
            repository_path("team", "base/alpine"),
            "/projects/team/repositories/base%252Falpine"
        );
        assert_eq!(
            repository_path("team", "nginx"),
            "/projects/team/repositories/nginx"
        );
    }
}
