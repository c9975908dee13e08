//! WebSocket handler
//!
//! Runs one client connection: a reader task feeding frames to the
//! handlers and a writer task that owns the socket sink, numbers outgoing
//! dispatches and enforces the heartbeat timeout.

use crate::connection::{Connection, Outbound};
use crate::handlers::{HandlerError, MessageDispatcher};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::RelayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let config = state.config();

    if !config.cors.permits(origin, config.app.env) {
        tracing::warn!(origin = ?origin, "WebSocket upgrade rejected, origin not allowed");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Heartbeat settings for one connection
#[derive(Debug, Clone, Copy)]
struct HeartbeatPolicy {
    interval: Duration,
    timeout: Duration,
}

impl HeartbeatPolicy {
    fn from_state(state: &RelayState) -> Self {
        let relay = &state.config().relay;
        Self {
            interval: Duration::from_millis(relay.heartbeat_interval_ms),
            timeout: Duration::from_millis(relay.heartbeat_timeout_ms),
        }
    }

    /// How often the writer checks for an idle client
    fn check_period(self) -> Duration {
        (self.interval / 2).max(Duration::from_millis(1))
    }
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: RelayState, socket: WebSocket) {
    let heartbeat = HeartbeatPolicy::from_state(&state);
    let (tx, rx) = mpsc::channel::<Outbound>(state.config().relay.outbound_buffer);
    let connection = state.connection_manager().on_connect(tx);
    let connection_id = connection.id();

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, ws_stream) = socket.split();

    // Hello goes out before any queued event can
    let hello = GatewayMessage::hello(&HelloPayload::new(
        connection_id,
        state.config().relay.heartbeat_interval_ms,
    ));
    let hello_sent = match hello.to_json() {
        Ok(json) => ws_sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to encode Hello");
            false
        }
    };
    if !hello_sent {
        tracing::warn!(connection_id = %connection_id, "Failed to send Hello message");
        cleanup_connection(&state, &connection);
        return;
    }

    let mut recv_task = tokio::spawn(read_frames(state.clone(), connection.clone(), ws_stream));
    let mut send_task = tokio::spawn(write_frames(connection.clone(), rx, ws_sink, heartbeat));

    tokio::select! {
        result = &mut recv_task => {
            send_task.abort();
            if let Ok(Some(close_code)) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    close_code = %close_code,
                    "Receive task ended with close code"
                );
            }
        }
        _ = &mut send_task => {
            recv_task.abort();
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
    }

    cleanup_connection(&state, &connection);
}

/// Read client frames until the client goes away
///
/// Returns the close code when the connection ended because of an error.
async fn read_frames(
    state: RelayState,
    connection: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) -> Option<CloseCode> {
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "WebSocket error"
                );
                return Some(CloseCode::UnknownError);
            }
        };

        // Any frame proves the client is alive
        connection.touch();

        match frame {
            Message::Text(text) => {
                if let Err(e) = MessageDispatcher::dispatch_text(&state, &connection, &text) {
                    if let Some(close_code) = e.to_close_code() {
                        return Some(close_code);
                    }
                    log_dropped_frame(&connection, &e);
                }
            }
            Message::Binary(_) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    "Binary frames not supported, dropped"
                );
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Pong is handled automatically by axum
                tracing::trace!(connection_id = %connection.id(), "Ping/Pong received");
            }
            Message::Close(_) => {
                tracing::info!(connection_id = %connection.id(), "Client closed connection");
                return None;
            }
        }
    }

    None
}

fn log_dropped_frame(connection: &Connection, error: &HandlerError) {
    match error {
        HandlerError::ServerOnlyOp(_) => {
            tracing::warn!(connection_id = %connection.id(), error = %error, "Frame dropped");
        }
        _ => {
            tracing::debug!(connection_id = %connection.id(), error = %error, "Frame dropped");
        }
    }
}

/// Drain the outbound queue into the socket and watch the heartbeat
///
/// Sequence numbers are stamped here so they follow write order.
async fn write_frames(
    connection: Arc<Connection>,
    mut rx: mpsc::Receiver<Outbound>,
    mut sink: SplitSink<WebSocket, Message>,
    heartbeat: HeartbeatPolicy,
) {
    let mut check = interval(heartbeat.check_period());
    check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = rx.recv() => {
                let Some(item) = item else { break };

                let encoded = match item {
                    Outbound::Event(event) => {
                        GatewayMessage::encode_dispatch(&event, connection.next_sequence())
                    }
                    Outbound::Control(message) => message.to_json(),
                    Outbound::Close(close_code) => {
                        send_close(&mut sink, close_code).await;
                        break;
                    }
                };

                let json = match encoded {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(
                            connection_id = %connection.id(),
                            error = %e,
                            "Failed to encode outgoing frame"
                        );
                        continue;
                    }
                };

                if sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        "Failed to send message to WebSocket"
                    );
                    break;
                }
            }
            _ = check.tick() => {
                let idle = connection.idle_for();
                if idle > heartbeat.timeout {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        idle_ms = idle.as_millis(),
                        "Connection timed out (no heartbeat)"
                    );
                    send_close(&mut sink, CloseCode::SessionTimeout).await;
                    break;
                }
            }
        }
    }
}

async fn send_close(sink: &mut SplitSink<WebSocket, Message>, close_code: CloseCode) {
    let frame = CloseFrame {
        code: close_code.as_u16(),
        reason: close_code.description().into(),
    };

    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, close_code = %close_code, "Failed to send close frame");
    }
}

/// Clean up a connection on disconnect
fn cleanup_connection(state: &RelayState, connection: &Arc<Connection>) {
    let removed = state.connection_manager().on_disconnect(connection.id());

    tracing::info!(
        connection_id = %connection.id(),
        removed = removed,
        duration_ms = connection.age().as_millis(),
        "WebSocket connection closed"
    );
}
