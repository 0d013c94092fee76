//! Error types for commands, the transport and room resets.

use thiserror::Error;
use validator::ValidationErrors;

use crate::{transport::codec::CodecError, view::Control};

/// Errors raised while handling a player command.
///
/// None of them is fatal: the runtime logs them and surfaces a notice at most.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The control is locked (not authenticated, finished, or time is up).
    #[error("control `{0}` is disabled")]
    ControlDisabled(Control),
    /// Invalid input provided by the player.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The current form has no control with this key.
    #[error("no control named `{0}` in the current form")]
    UnknownControl(String),
    /// The value does not fit the control.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Key of the control being edited.
        key: String,
        /// Why the value was refused.
        reason: String,
    },
    /// Resetting the room failed.
    #[error("room reset failed")]
    Reset(#[from] ResetError),
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

/// Failures of the push-messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket could not be opened.
    #[error("failed to connect to `{url}`")]
    Connect {
        /// Endpoint that was dialled.
        url: String,
        /// Underlying WebSocket error.
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// Reading or writing a frame failed.
    #[error("websocket error")]
    Socket(#[source] Box<tokio_tungstenite::tungstenite::Error>),
    /// The server refused the namespace connection.
    #[error("connection refused by server: {0}")]
    Rejected(String),
    /// A frame could not be decoded.
    #[error("malformed frame")]
    Codec(#[from] CodecError),
    /// The handshake did not complete in time.
    #[error("handshake timed out")]
    Timeout,
    /// The session is gone.
    #[error("connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Socket(Box::new(err))
    }
}

/// Failures of the reload-with-reset-marker path.
#[derive(Debug, Error)]
pub enum ResetError {
    /// The reset request could not be sent.
    #[cfg(feature = "http-reset")]
    #[error("failed to send reset request to `{url}`")]
    Request {
        /// Reset URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with an error status.
    #[error("unexpected reset response status {status} for `{url}`")]
    Status {
        /// Reset URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The binary was built without HTTP support.
    #[error("reset by reload requires the `http-reset` feature")]
    Unsupported,
}
