//! WebSocket test client
//!
//! Speaks the relay's `{op, t, s, d}` framing over `tokio-tungstenite`.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::TestServer;

/// Time allowed for any single expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Time waited when asserting that nothing arrives
pub const SILENCE: Duration = Duration::from_millis(200);

/// One dispatched event as seen by a client
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub name: String,
    pub seq: u64,
    pub payload: Value,
}

/// A connected relay client that has consumed its Hello
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Connection id announced in Hello
    pub connection_id: String,
    /// Heartbeat interval announced in Hello
    pub heartbeat_interval: u64,
}

impl WsClient {
    /// Connect to `/ws` and read the Hello frame
    pub async fn connect(server: &TestServer) -> Result<Self> {
        Self::connect_url(&server.ws_url("/ws"), None).await
    }

    /// Connect with an `Origin` header
    pub async fn connect_with_origin(server: &TestServer, origin: &str) -> Result<Self> {
        Self::connect_url(&server.ws_url("/ws"), Some(origin)).await
    }

    /// Connect to an arbitrary relay URL
    pub async fn connect_url(url: &str, origin: Option<&str>) -> Result<Self> {
        let mut request = url.into_client_request()?;
        if let Some(origin) = origin {
            request
                .headers_mut()
                .insert("origin", HeaderValue::from_str(origin)?);
        }

        let (stream, _response) = connect_async(request).await?;
        let mut client = Self {
            stream,
            connection_id: String::new(),
            heartbeat_interval: 0,
        };

        let hello = client.recv_frame().await?;
        anyhow::ensure!(hello["op"] == 10, "Expected Hello, got {hello}");
        client.connection_id = hello["d"]["connection_id"]
            .as_str()
            .context("Hello without connection_id")?
            .to_string();
        client.heartbeat_interval = hello["d"]["heartbeat_interval"]
            .as_u64()
            .context("Hello without heartbeat_interval")?;

        Ok(client)
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Emit an application event (op 0)
    pub async fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        self.send_text(json!({"op": 0, "t": event, "d": payload}).to_string())
            .await
    }

    /// Send a heartbeat (op 1)
    pub async fn heartbeat(&mut self, last_seq: Option<u64>) -> Result<()> {
        self.send_text(json!({"op": 1, "d": last_seq}).to_string())
            .await
    }

    /// Join a room and wait for the acknowledgement
    pub async fn join(&mut self, room: &str) -> Result<()> {
        self.emit("join_room", json!({"roomId": room})).await?;
        let ack = self.expect_event("room_joined").await?;
        anyhow::ensure!(ack.payload["roomId"] == room, "Unexpected ack {ack:?}");
        Ok(())
    }

    /// Leave a room and wait for the acknowledgement
    pub async fn leave(&mut self, room: &str) -> Result<()> {
        self.emit("leave_room", json!({"roomId": room})).await?;
        self.expect_event("room_left").await?;
        Ok(())
    }

    /// Next text frame parsed as JSON
    pub async fn recv_frame(&mut self) -> Result<Value> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for a frame")?
                .context("Connection closed")??;

            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => anyhow::bail!("Connection closed: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Next dispatched event
    pub async fn recv_event(&mut self) -> Result<Dispatch> {
        let frame = self.recv_frame().await?;
        anyhow::ensure!(frame["op"] == 0, "Expected dispatch, got {frame}");

        Ok(Dispatch {
            name: frame["t"].as_str().context("Dispatch without name")?.to_string(),
            seq: frame["s"].as_u64().context("Dispatch without sequence")?,
            payload: frame["d"].clone(),
        })
    }

    /// Next dispatched event, which must be named `name`
    pub async fn expect_event(&mut self, name: &str) -> Result<Dispatch> {
        let event = self.recv_event().await?;
        anyhow::ensure!(event.name == name, "Expected {name}, got {event:?}");
        Ok(event)
    }

    /// Assert that no text frame arrives for a short while
    pub async fn expect_silence(&mut self) -> Result<()> {
        match tokio::time::timeout(SILENCE, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => anyhow::bail!("Unexpected frame {text}"),
            Ok(other) => anyhow::bail!("Unexpected stream item {other:?}"),
        }
    }

    /// Wait for the server to close the socket and return the close code
    pub async fn expect_close(&mut self, within: Duration) -> Result<u16> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let message = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .context("Timed out waiting for close")?
                .context("Stream ended without close frame")??;

            if let Message::Close(frame) = message {
                let frame = frame.context("Close frame without code")?;
                return Ok(u16::from(frame.code));
            }
        }
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
