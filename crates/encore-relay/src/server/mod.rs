//! Relay server setup
//!
//! Provides the HTTP/WebSocket routes and the server lifecycle.

mod api;
mod handler;
mod state;

pub use api::{
    create_cors_layer, health_check, publish, stats, ApiError, PublishRequest, PublishResponse,
    StatsResponse,
};
pub use handler::gateway_handler;
pub use state::RelayState;

use crate::protocol::CloseCode;
use axum::{
    body::Body,
    http::{header::HeaderName, Request},
    routing::{get, post},
    Router,
};
use encore_common::{AppConfig, AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// How often connections whose writer is gone are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Create the relay router
pub fn create_router() -> Router<RelayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/publish", post(publish))
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    let config = state.config();
    let cors = create_cors_layer(&config.cors, config.app.env);

    create_router()
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .with_state(state)
}

/// Create `RelayState` from configuration
///
/// # Errors
/// Returns an error if the relay settings are unusable.
pub fn create_relay_state(config: AppConfig) -> AppResult<RelayState> {
    if config.relay.outbound_buffer == 0 {
        return Err(AppError::invalid_input("outbound buffer must be positive"));
    }

    Ok(RelayState::new(config))
}

/// Serve the relay on `listener` until `shutdown` resolves
///
/// Open connections are sent a close frame once shutdown begins.
///
/// # Errors
/// Returns an error if the server fails while running.
pub async fn run_server<F>(listener: TcpListener, state: RelayState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = spawn_sweeper(state.clone());
    let app = create_app(state.clone());

    let closing = state.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let closed = closing.connection_manager().close_all(CloseCode::ServerShutdown);
            tracing::info!(connections = closed, "Shutting down, closing connections");
        })
        .await
        .map_err(AppError::Server);

    sweeper.abort();
    result
}

/// Run the complete relay server with configuration
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.relay.socket_addr()?;
    let state = create_relay_state(config)?;

    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;

    tracing::info!("Relay listening on ws://{}/ws", addr);

    run_server(listener, state, shutdown_signal()).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// Periodically drop connections whose writer task has exited
fn spawn_sweeper(state: RelayState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            state.connection_manager().cleanup_closed_connections();
        }
    })
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to register ctrl-c handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
