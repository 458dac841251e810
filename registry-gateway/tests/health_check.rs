mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "registry-gateway");
}

#[tokio::test]
async fn index_greets() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "Hello, World!");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn metrics_expose_registry_and_http_series() {
    registry_gateway::services::init_metrics().expect("Failed to install recorder");
    let app = TestApp::spawn().await;
    app.registry.seed_project("payments", &["alice"]);

    app.get("/api/v1/project/alice").await;
    let response = app.get("/metrics").await;

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("http_requests_total"));
}
