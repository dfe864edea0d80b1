use crate::config::RelayConfig;
use crate::signaling::{RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub rooms: usize,
    pub peers: usize,
}

/// HTTP routes of the relay: websocket upgrade on `/` and `/ws`, plus `/health`.
pub fn router(service: RelayService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

async fn health(State(service): State<RelayService>) -> Json<HealthReport> {
    let registry = service.registry();
    Json(HealthReport {
        status: "ok",
        rooms: registry.room_count(),
        peers: registry.peer_count(),
    })
}

/// Binds `config.bind_addr` and serves until `shutdown` resolves.
pub async fn serve<F>(config: RelayConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind relay on {}", config.bind_addr))?;
    serve_listener(listener, RelayService::new(), shutdown).await
}

/// Serves the relay on an already bound listener.
pub async fn serve_listener<F>(listener: TcpListener, service: RelayService, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Signaling server listening on ws://{}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Relay server terminated with an error")?;

    info!("Signaling server stopped");
    Ok(())
}
