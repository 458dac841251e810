mod common;

use common::{error_code, TestApp};
use registry_gateway::services::registry::{ProjectRole, RegistryOperation};
use reqwest::StatusCode;

#[tokio::test]
async fn issued_credential_grants_developer_access() {
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &["alice"]);

    let response = app
        .client
        .post(app.url("/api/v1/project/payments/credential"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let name = body["name"].as_str().unwrap();
    let password = body["password"].as_str().unwrap();
    assert!(!name.is_empty());
    assert!(!password.is_empty());
    assert_eq!(body["project_name"], "payments");

    assert!(app.registry.authenticate_robot(name, password));
    let grant = app
        .registry
        .members_of("payments")
        .into_iter()
        .find(|m| m.entity_name == name)
        .expect("robot has no membership");
    assert_eq!(grant.role, Some(ProjectRole::Developer));
}

#[tokio::test]
async fn failed_grant_rolls_back_robot() {
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &["alice"]);
    app.registry
        .fail_on(RegistryOperation::AddProjectMember, "member api down");

    let response = app
        .client
        .post(app.url("/api/v1/project/payments/credential"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "921");
    assert!(app.registry.robot_names().is_empty());
    assert_eq!(app.registry.members_of("payments").len(), 1);
    assert_eq!(
        app.registry.calls(),
        vec![
            RegistryOperation::CreateRobotAccount,
            RegistryOperation::AddProjectMember,
            RegistryOperation::DeleteRobotAccount,
        ]
    );
}

#[tokio::test]
async fn failed_rollback_is_named_in_detail() {
    let app = TestApp::spawn().await;
    app.registry
        .fail_on(RegistryOperation::AddProjectMember, "grant refused");
    app.registry
        .fail_on(RegistryOperation::DeleteRobotAccount, "delete refused");

    let response = app
        .client
        .post(app.url("/api/v1/project/payments/credential"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "921");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("grant refused"));
    assert!(detail.contains("delete refused"));
}

#[tokio::test]
async fn failed_robot_creation_is_reported() {
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &[]);
    app.registry
        .fail_on(RegistryOperation::CreateRobotAccount, "quota reached");

    let response = app
        .client
        .post(app.url("/api/v1/project/payments/credential"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(error_code(response).await, "920");
    assert_eq!(
        app.registry.calls(),
        vec![RegistryOperation::CreateRobotAccount]
    );
}
