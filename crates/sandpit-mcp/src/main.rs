//! `sandpit-mcp` binary.
//!
//! Serves the Sandpit tools over stdio, streamable HTTP, or both
//! (`SANDPIT_TRANSPORT`). Sandboxes live on the control plane, so stopping
//! the server leaves them as they are.

use rmcp::transport::stdio;
use rmcp::ServiceExt;
use sandpit_mcp::{http, ConfigError, SandpitConfig, SandpitServer};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP frames, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("sandpit_mcp=info".parse()?)
                .add_directive("sandpit_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SandpitConfig::from_env();
    match config.validate() {
        Ok(()) => {}
        // A local mock control plane needs no token
        Err(ConfigError::MissingToken) => config.validate_warn(),
        Err(e) => return Err(e.into()),
    }

    let server = SandpitServer::new(config.clone())?;
    tracing::info!(
        control_plane = %config.api.base_url,
        default_template = server.client().config().default_template(),
        transport = ?config.transport_mode,
        "Sandpit MCP server starting"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut transports = Vec::new();

    if config.transport_mode.http_enabled() {
        transports.push(spawn_http(&server, &config, shutdown_tx.subscribe()));
    }
    if config.transport_mode.stdio_enabled() {
        transports.push(spawn_stdio(&server, shutdown_tx.subscribe()));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down transports");
    let _ = shutdown_tx.send(());

    for transport in transports {
        let _ = transport.await;
    }
    Ok(())
}

fn spawn_http(
    server: &SandpitServer,
    config: &SandpitConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let server = server.clone();
    let addr = config.http_addr;

    tokio::spawn(async move {
        let stop = async move {
            let _ = shutdown.recv().await;
        };
        if let Err(e) = http::serve(server, addr, stop).await {
            tracing::error!(%addr, error = %e, "HTTP transport failed");
        }
    })
}

fn spawn_stdio(server: &SandpitServer, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    let server = server.clone();

    tokio::spawn(async move {
        let service = match server.serve(stdio()).await {
            Ok(service) => service,
            Err(e) => {
                tracing::error!(error = %e, "stdio transport failed to start");
                return;
            }
        };
        tracing::info!("stdio transport ready");

        tokio::select! {
            result = service.waiting() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "stdio transport stopped");
                }
            }
            _ = shutdown.recv() => {}
        }
    })
}
