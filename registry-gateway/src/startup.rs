//! Router construction and server lifecycle.

use axum::{
    middleware::from_fn,
    routing::{delete, get, patch, post},
    Router,
};
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::handlers;
use crate::services::{HarborClient, RegistryClient};
use crate::AppState;

/// Builds the gateway router.
///
/// axum requires sibling routes to agree on parameter names, so every route
/// under `/api/v1/project/` names its first segment `:project`, including the
/// one where it carries a username.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/project", post(handlers::projects::create_project))
        .route("/project/", post(handlers::projects::create_project))
        .route(
            "/project/:project",
            get(handlers::projects::list_accessible_projects)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/project/:project/repositories",
            get(handlers::repositories::list_repositories),
        )
        .route(
            "/project/:project/repository/:repository",
            delete(handlers::repositories::delete_repository),
        )
        .route(
            "/project/:project/repository/:repository/tags",
            get(handlers::repositories::list_tags),
        )
        .route(
            "/project/:project/credential",
            post(handlers::credentials::issue_credential),
        )
        .route("/user", post(handlers::users::create_user))
        .route("/user/:user", delete(handlers::users::delete_user))
        .route("/userpassword", patch(handlers::users::update_password))
        .route("/userprofile", patch(handlers::users::update_profile));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Builds the application against the Harbor registry named in `settings`.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let harbor = HarborClient::new(&settings.registry)?;
        tracing::info!(registry = %settings.registry.url, "Harbor client initialized");
        Self::build_with_registry(settings, Arc::new(harbor)).await
    }

    /// Builds the application against any registry implementation.
    pub async fn build_with_registry(
        settings: Settings,
        registry: Arc<dyn RegistryClient>,
    ) -> anyhow::Result<Self> {
        // Port 0 binds a random port, used by the tests.
        let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .map_err(|e| {
                anyhow::anyhow!(
                    "invalid listen address {}:{}: {}",
                    settings.server.host,
                    settings.server.port,
                    e
                )
            })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();

        let router = build_router(AppState::new(&settings, registry));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves requests until ctrl-c or SIGTERM.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Registry gateway listening on port {}", self.port);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Registry gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
