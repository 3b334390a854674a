//! Streamable HTTP transport for remote agents.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness, plus the control plane this server talks to |
//! | `GET /` | service descriptor listing the tools |
//! | anything else | MCP (JSON-RPC over POST, SSE over GET) |

use crate::server::SandpitServer;
use axum::{response::Json, routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SERVICE: &str = "sandpit-mcp";

#[derive(Debug, Clone, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    control_plane: String,
}

#[derive(Debug, Clone, Serialize)]
struct Descriptor {
    service: &'static str,
    version: &'static str,
    transport: &'static str,
    tools: Vec<String>,
}

/// Build the HTTP router for `server`.
pub fn build_router(server: SandpitServer) -> Router {
    let health = Health {
        status: "healthy",
        service: SERVICE,
        control_plane: server.config().api.base_url.clone(),
    };
    let descriptor = Descriptor {
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
        transport: "streamable-http",
        tools: SandpitServer::tool_names(),
    };

    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .route("/health", get(move || std::future::ready(Json(health.clone()))))
        .route("/", get(move || std::future::ready(Json(descriptor.clone()))))
        .fallback_service(mcp_service)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve MCP over HTTP on `addr` until `shutdown` resolves.
pub async fn serve(
    server: SandpitServer,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP transport listening");

    axum::serve(listener, build_router(server))
        .with_graceful_shutdown(shutdown)
        .await
}
