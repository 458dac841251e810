#![allow(dead_code)]

use registry_gateway::config::{
    ProvisioningSettings, RegistrySettings, ServerSettings, Settings, TelemetrySettings,
};
use registry_gateway::services::InMemoryRegistry;
use registry_gateway::Application;
use reqwest::{Client, Response};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub registry: Arc<InMemoryRegistry>,
    pub client: Client,
}

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        registry: RegistrySettings {
            url: "http://registry.invalid".to_string(),
            username: "admin".to_string(),
            password: Secret::new("Harbor12345".to_string()),
            timeout: Duration::from_secs(5),
        },
        provisioning: ProvisioningSettings {
            robot_name_prefix: "gw-".to_string(),
        },
        telemetry: TelemetrySettings {
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        service_name: "registry-gateway-test".to_string(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let registry = Arc::new(InMemoryRegistry::new());

        let app = Application::build_with_registry(test_settings(), registry.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            registry,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Reads a `{code, detail}` error body and returns its code.
pub async fn error_code(response: Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["detail"].is_string(), "missing detail in {}", body);
    body["code"].as_str().expect("missing code").to_string()
}
