use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use scrapemaster_core::config::EngineConfig;
use scrapemaster_core::identity::ProxyPool;
use scrapemaster_server::config::ServerConfig;
use scrapemaster_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scrapemaster=info".parse()?))
        .with_target(false)
        .init();

    let server = ServerConfig::from_env()?;
    let engine = EngineConfig::from_env()?;
    let proxies = ProxyPool::from_env()?;
    tracing::info!(proxies = proxies.len(), "Proxy pool loaded");

    let state = Arc::new(AppState::from_config(engine, proxies)?);

    let addr = server.addr();
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    scrapemaster_server::serve(listener, state, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
