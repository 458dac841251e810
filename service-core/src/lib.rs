//! service-core: Shared infrastructure for the registry gateway services.
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use tower;
pub use tower_http;
pub use tracing;
