use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::connection::{self, ConnectionConfig};
use crate::context::BridgeContext;
use crate::health;
use crate::rest;
use crate::shutdown::ShutdownCoordinator;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<BridgeContext>,
    pub connection: ConnectionConfig,
    pub started_at: Instant,
    pub shutdown: ShutdownCoordinator,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/stream", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/tts", post(rest::tts_handler))
        .route("/combat", post(rest::combat_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind the listener and serve in the background.
pub async fn start(
    config: ServerConfig,
    ctx: Arc<BridgeContext>,
) -> Result<ServerHandle, std::io::Error> {
    let shutdown = ShutdownCoordinator::new();
    let state = AppState {
        ctx,
        connection: ConnectionConfig {
            max_send_queue: config.max_send_queue,
            heartbeat_interval: config.heartbeat_interval(),
        },
        started_at: Instant::now(),
        shutdown: shutdown.clone(),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "dojo bridge listening");

    let token = shutdown.token();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, build_router(state))
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown,
        server,
    })
}

/// Handle returned by [`start`]; keeps the server task alive.
pub struct ServerHandle {
    pub port: u16,
    shutdown: ShutdownCoordinator,
    server: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections, let open ones finish their implicit
    /// session end, and wait up to `timeout`.
    pub async fn shutdown(self, timeout: Option<Duration>) {
        self.shutdown
            .graceful_shutdown(vec![self.server], timeout)
            .await;
        tracing::info!("dojo bridge stopped");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let AppState {
        ctx,
        connection,
        shutdown,
        ..
    } = state;
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, ctx, connection, shutdown.token())
    })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(health::health_check(state.started_at))
}
