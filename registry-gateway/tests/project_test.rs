mod common;

use common::{error_code, TestApp};
use registry_gateway::services::registry::{ProjectRole, RegistryOperation};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn create_project_makes_owner_admin() {
    let app = TestApp::spawn().await;
    app.registry.seed_user("alice");

    let response = app
        .post_json(
            "/api/v1/project/",
            &json!({ "project_name": "payments", "user_name": "alice" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let project = app.registry.project("payments").expect("project missing");
    assert!(!project.public);
    let members = app.registry.members_of("payments");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].entity_name, "alice");
    assert_eq!(members[0].role, Some(ProjectRole::ProjectAdmin));
}

#[tokio::test]
async fn created_project_becomes_accessible_to_owner() {
    let app = TestApp::spawn().await;
    app.registry.seed_user("alice");

    let response = app
        .post_json(
            "/api/v1/project",
            &json!({ "project_name": "payments", "user_name": "alice" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/api/v1/project/alice").await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["projects"], json!(["payments"]));
}

#[tokio::test]
async fn empty_owner_is_rejected_without_registry_calls() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/v1/project/",
            &json!({ "project_name": "payments", "user_name": "" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "910");
    assert!(app.registry.calls().is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/v1/project/"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "910");
    assert!(app.registry.calls().is_empty());
}

#[tokio::test]
async fn duplicate_project_reports_creation_failure() {
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &["alice"]);

    let response = app
        .post_json(
            "/api/v1/project/",
            &json!({ "project_name": "payments", "user_name": "alice" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "901");
    assert_eq!(app.registry.calls(), vec![RegistryOperation::CreateProject]);
}

#[tokio::test]
async fn unknown_owner_leaves_project_without_admin() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/v1/project/",
            &json!({ "project_name": "payments", "user_name": "ghost" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "902");
    assert!(app.registry.project("payments").is_some());
    assert!(app.registry.members_of("payments").is_empty());
    assert!(!app
        .registry
        .calls()
        .contains(&RegistryOperation::DeleteProject));
}

#[tokio::test]
async fn delete_project_removes_it() {
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &["alice"]);

    let response = app.delete("/api/v1/project/payments").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.registry.project("payments").is_none());
}

#[tokio::test]
async fn deleting_missing_project_is_reported() {
    let app = TestApp::spawn().await;

    let response = app.delete("/api/v1/project/nowhere").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "903");
}
