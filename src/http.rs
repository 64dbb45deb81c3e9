//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::{error, info};

use crate::metrics::MetricsRegistry;

/// Liveness endpoint, always served next to the metrics path.
pub const HEALTH_PATH: &str = "/health";

/// Create the HTTP router.
///
/// `metrics_path` must have passed [`MetricsConfig::validate`]; axum rejects
/// other paths when the route is added.
///
/// [`MetricsConfig::validate`]: crate::config::MetricsConfig::validate
fn create_router(registry: MetricsRegistry, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(registry)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(registry): State<MetricsRegistry>) -> Response {
    match registry.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

pub struct HttpServer {
    registry: MetricsRegistry,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    pub fn new(registry: MetricsRegistry, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            registry,
            listen_addr,
            metrics_path,
        }
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        let router = create_router(self.registry, &self.metrics_path);
        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router).await
    }
}
