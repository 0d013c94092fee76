//! Push-messaging transport seam.
//!
//! The runtime only sees a [`TransportSession`]: a pair of channels carrying [`WireEvent`]s.
//! Framing, heartbeats and the socket itself live behind a [`Connector`].

use std::future::Future;

use tokio::sync::mpsc;

use crate::{dto::events::WireEvent, error::TransportError};

pub mod codec;
mod socketio;

pub use self::socketio::SocketIoConnector;

/// What the transport reports to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// An inbound named event.
    Event(WireEvent),
    /// The session ended; no further signal follows.
    Closed,
}

/// Opens transport sessions. One call is one connection attempt.
pub trait Connector: Clone + Send + Sync + 'static {
    /// Establish a session, or fail the attempt.
    fn connect(&self) -> impl Future<Output = Result<TransportSession, TransportError>> + Send;
}

/// An established session as seen by the runtime.
#[derive(Debug)]
pub struct TransportSession {
    outbound: mpsc::UnboundedSender<WireEvent>,
    inbound: mpsc::UnboundedReceiver<TransportSignal>,
}

/// The transport side of a [`TransportSession`].
#[derive(Debug)]
pub struct TransportPeer {
    /// Events the runtime emitted.
    pub sent: mpsc::UnboundedReceiver<WireEvent>,
    /// Feed inbound events and the final [`TransportSignal::Closed`].
    pub incoming: mpsc::UnboundedSender<TransportSignal>,
}

impl TransportSession {
    /// Create a connected session/peer pair.
    pub fn channel() -> (Self, TransportPeer) {
        let (outbound, sent) = mpsc::unbounded_channel();
        let (incoming, inbound) = mpsc::unbounded_channel();
        (Self { outbound, inbound }, TransportPeer { sent, incoming })
    }

    /// Queue an event for the server.
    pub fn send(&self, event: WireEvent) -> Result<(), TransportError> {
        self.outbound
            .send(event)
            .map_err(|_| TransportError::Closed)
    }

    /// Next signal; a dropped peer reads as [`TransportSignal::Closed`].
    pub async fn recv(&mut self) -> TransportSignal {
        self.inbound.recv().await.unwrap_or(TransportSignal::Closed)
    }
}
