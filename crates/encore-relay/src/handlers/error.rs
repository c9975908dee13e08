//! Handler error types

use crate::broadcast::RouteError;
use crate::protocol::{CloseCode, OpCode};
use thiserror::Error;

/// Handler error type
///
/// Most errors only cost the offending frame; see [`HandlerError::to_close_code`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame was not valid JSON or not a relay envelope
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// Invalid payload for a control event
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Client sent an op code only the server may send
    #[error("Op code {0} is not accepted from clients")]
    ServerOnlyOp(OpCode),

    /// Event could not be routed
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The connection's own outbound queue is gone
    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    /// Close code for errors that end the connection
    ///
    /// Returns `None` for errors where the frame is dropped and the
    /// connection stays open.
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::ConnectionClosed => Some(CloseCode::UnknownError),
            Self::MalformedFrame(_)
            | Self::InvalidPayload(_)
            | Self::ServerOnlyOp(_)
            | Self::Route(_) => None,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
