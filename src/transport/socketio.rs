//! Socket.IO v5 client over a WebSocket-only Engine.IO v4 session.

use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};
use tracing::{debug, info, warn};

use crate::{
    error::TransportError,
    transport::{
        Connector, TransportPeer, TransportSession, TransportSignal,
        codec::{self, CONNECT_FRAME, EnginePacket, PONG_FRAME, SocketPacket},
    },
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket.IO client restricted to the WebSocket transport.
#[derive(Debug, Clone)]
pub struct SocketIoConnector {
    url: String,
}

impl SocketIoConnector {
    /// Connector dialling `url`, e.g. `ws://host/socket.io/?EIO=4&transport=websocket`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Endpoint dialled by every attempt.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for SocketIoConnector {
    async fn connect(&self) -> Result<TransportSession, TransportError> {
        let (mut socket, _response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|source| TransportError::Connect {
                    url: self.url.clone(),
                    source: Box::new(source),
                })?;

        tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut socket))
            .await
            .map_err(|_| TransportError::Timeout)??;
        info!(url = %self.url, "socket.io session established");

        let (session, peer) = TransportSession::channel();
        let (sink, stream) = socket.split();
        spawn_pumps(sink, stream, peer);
        Ok(session)
    }
}

/// Wait for the Engine.IO open packet, join the default namespace and wait for the ack.
async fn handshake(socket: &mut Socket) -> Result<(), TransportError> {
    let mut opened = false;
    while let Some(message) = socket.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => return Err(TransportError::Closed),
            _ => continue,
        };

        match codec::decode(text.as_str())? {
            EnginePacket::Open(params) => {
                debug!(sid = ?params.get("sid"), "engine.io session opened");
                socket.send(Message::text(CONNECT_FRAME)).await?;
                opened = true;
            }
            EnginePacket::Ping => socket.send(Message::text(PONG_FRAME)).await?,
            EnginePacket::Message(SocketPacket::Connect(_)) if opened => return Ok(()),
            EnginePacket::Message(SocketPacket::ConnectError(body)) => {
                let reason = body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string());
                return Err(TransportError::Rejected(reason));
            }
            EnginePacket::Close => return Err(TransportError::Closed),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

/// Move frames between the socket and the session channels until either side goes away.
///
/// Whichever pump stops first ends the session: the runtime always gets exactly one
/// [`TransportSignal::Closed`] from a live link.
fn spawn_pumps<W, R>(mut sink: W, mut stream: R, peer: TransportPeer)
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
{
    let TransportPeer { mut sent, incoming } = peer;
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Message>();
    let closed = incoming.clone();

    let reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => match codec::decode(text.as_str()) {
                    Ok(EnginePacket::Ping) => {
                        let _ = control_tx.send(Message::text(PONG_FRAME));
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event(event))) => {
                        if incoming.send(TransportSignal::Event(event)).is_err() {
                            break;
                        }
                    }
                    Ok(EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect)) => {
                        info!("server closed the socket.io session");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, frame = %text.as_str(), "dropping undecodable frame")
                    }
                },
                Ok(Message::Ping(payload)) => {
                    let _ = control_tx.send(Message::Pong(payload));
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "websocket error");
                    break;
                }
            }
        }
    });

    // Dedicated writer keeps outbound events and heartbeat answers flowing while the reader awaits.
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                event = sent.recv() => match event {
                    Some(event) => match codec::encode_event(&event) {
                        Ok(frame) => Message::text(frame),
                        Err(err) => {
                            warn!(event = %event.name, error = %err, "failed to encode event");
                            continue;
                        }
                    },
                    None => break,
                },
                // Closes once the reader has stopped.
                frame = control_rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if let Err(err) = sink.send(message).await {
                warn!(error = %err, "websocket write failed");
                break;
            }
        }
        reader.abort();
        let _ = sink.close().await;
        let _ = closed.send(TransportSignal::Closed);
    });
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures::{sink, stream};
    use serde_json::json;

    use super::*;
    use crate::dto::events::WireEvent;

    #[tokio::test]
    async fn failed_write_closes_the_session() {
        let failing = Box::pin(sink::unfold((), |(), _frame: Message| async {
            Err::<(), _>(tungstenite::Error::ConnectionClosed)
        }));
        let silent = stream::pending::<Result<Message, tungstenite::Error>>();

        let (mut session, peer) = TransportSession::channel();
        spawn_pumps(failing, silent, peer);
        session
            .send(WireEvent {
                name: "hint".into(),
                payload: json!({"room": "A1"}),
            })
            .unwrap();

        let signal = tokio::time::timeout(Duration::from_secs(5), session.recv())
            .await
            .unwrap();
        assert_eq!(signal, TransportSignal::Closed);
    }

    #[tokio::test]
    async fn server_close_reaches_the_session() {
        let (mut session, peer) = TransportSession::channel();
        let frames = stream::iter([
            Ok(Message::text(r#"42["chat",{"msg":"salut"}]"#)),
            Ok(Message::text("1")),
        ]);
        let discard = sink::drain().sink_map_err(|never: Infallible| -> tungstenite::Error { match never {} });
        spawn_pumps(discard, frames, peer);

        assert!(matches!(session.recv().await, TransportSignal::Event(event) if event.name == "chat"));
        assert_eq!(session.recv().await, TransportSignal::Closed);
    }
}
