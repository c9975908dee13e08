//! HTTP endpoints
//!
//! Health, stats and the server-side publish hook, plus the error response
//! and CORS layer they share.

use crate::events::Event;
use crate::server::RelayState;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use encore_common::{AppError, CorsConfig, Environment, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// HTTP error wrapper for [`AppError`]
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] AppError);

/// Error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Server error occurred");
        }

        let body = ErrorBody {
            error: ErrorResponse::from(&self.0),
        };

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Live counters
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub connections: usize,
    pub rooms: usize,
}

/// Stats endpoint
pub async fn stats(State(state): State<RelayState>) -> Json<StatsResponse> {
    let manager = state.connection_manager();
    Json(StatsResponse {
        connections: manager.connection_count(),
        rooms: manager.room_count(),
    })
}

/// Body of `POST /publish`
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub event: String,
    /// Target room; omitted for a global broadcast
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishResponse {
    pub delivered: usize,
}

/// Inject an event from the backend
pub async fn publish(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Json(request): Json<PublishRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    authorize(&headers, state.config().relay.publish_token.as_deref())?;

    let event_name = request.event.trim();
    if event_name.is_empty() {
        return Err(AppError::invalid_input("event name must not be empty").into());
    }

    let room = request.room.as_deref().filter(|room| !room.is_empty());
    let delivered = state
        .event_dispatcher()
        .publish_from_server(room, Event::new(event_name, request.payload));

    tracing::info!(
        event = %event_name,
        room = ?room,
        delivered = delivered,
        "Server event published"
    );

    Ok((StatusCode::ACCEPTED, Json(PublishResponse { delivered })))
}

/// Check the bearer token when one is configured
///
/// The token is compared as sent, in constant time.
fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::MissingAuth)?;

    if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::InvalidToken)
    }
}

/// Create the CORS layer for the HTTP endpoints
pub fn create_cors_layer(config: &CorsConfig, env: Environment) -> CorsLayer {
    let base_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return base_layer.allow_origin(Any);
    }

    if config.allowed_origins.is_empty() {
        if env.is_production() {
            tracing::warn!(
                "CORS: No allowed origins configured in production mode. \
                 Requests from browsers will be blocked."
            );
            return base_layer.allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()));
        }

        tracing::warn!(
            "CORS: Allowing any origin (development mode). \
             Configure CORS_ALLOWED_ORIGINS for production."
        );
        return base_layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS: Allowing {} configured origins", origins.len());
    base_layer.allow_origin(AllowOrigin::list(origins))
}
