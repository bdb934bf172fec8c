//! Gateway server binary

use dojo_gateway::config::GatewayConfig;
use dojo_gateway::state::AppState;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dojo_gateway::observability::init()?;

    let config = GatewayConfig::load()?;
    tracing::info!(
        environment = ?config.environment,
        backend = %config.backend.origin,
        "configuration loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let state = AppState::new(config)?;
    let app = dojo_gateway::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
