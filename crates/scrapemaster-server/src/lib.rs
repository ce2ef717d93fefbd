//! REST API and live WebSocket feed: routes, DTOs, and OpenAPI documentation.

pub mod config;
pub mod demo;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use scrapemaster_core::traits::{Extractor, Fetcher};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application: routes plus tracing and permissive CORS.
pub fn app<F, E>(state: Arc<AppState<F, E>>) -> Router
where
    F: Fetcher,
    E: Extractor,
{
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves, then stop every job worker.
pub async fn serve<F, E>(
    listener: TcpListener,
    state: Arc<AppState<F, E>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()>
where
    F: Fetcher,
    E: Extractor,
{
    let orchestrator = state.orchestrator.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    orchestrator.shutdown().await;
    Ok(())
}
