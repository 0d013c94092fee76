//! Text framing for Socket.IO v5 packets carried over Engine.IO v4.

use serde_json::Value;
use thiserror::Error;

use crate::dto::events::WireEvent;

/// Namespace CONNECT for the default namespace.
pub const CONNECT_FRAME: &str = "40";
/// Engine.IO heartbeat answer.
pub const PONG_FRAME: &str = "3";

/// Errors raised while decoding or encoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame carried no packet type.
    #[error("empty frame")]
    Empty,
    /// Unknown Engine.IO or Socket.IO packet type.
    #[error("unknown packet type `{0}`")]
    UnknownPacket(char),
    /// The event body was not `["name", ...]`.
    #[error("event frame is not a named array")]
    MalformedEvent,
    /// JSON body could not be parsed or produced.
    #[error("invalid json body")]
    Json(#[from] serde_json::Error),
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// Handshake carrying the session parameters.
    Open(Value),
    /// Server is closing the session.
    Close,
    /// Heartbeat probe; must be answered with [`PONG_FRAME`].
    Ping,
    /// Heartbeat answer.
    Pong,
    /// Socket.IO payload.
    Message(SocketPacket),
    /// Upgrade and noop packets, unused with a websocket-only transport.
    Ignored,
}

/// Socket.IO packet on the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace joined.
    Connect(Value),
    /// Namespace left.
    Disconnect,
    /// Named event.
    Event(WireEvent),
    /// Namespace join refused.
    ConnectError(Value),
    /// Acks and binary packets; this client never requests them.
    Ignored,
}

/// Decode one text frame.
pub fn decode(frame: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let body = chars.as_str();

    let packet = match kind {
        '0' => EnginePacket::Open(parse_json(body)?),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping,
        '3' => EnginePacket::Pong,
        '4' => EnginePacket::Message(decode_socket(body)?),
        '5' | '6' => EnginePacket::Ignored,
        other => return Err(CodecError::UnknownPacket(other)),
    };
    Ok(packet)
}

fn decode_socket(body: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = skip_namespace(chars.as_str());

    let packet = match kind {
        '0' => SocketPacket::Connect(parse_json(rest)?),
        '1' => SocketPacket::Disconnect,
        '2' => {
            // Optional ack id precedes the array.
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            SocketPacket::Event(decode_event(rest)?)
        }
        '4' => SocketPacket::ConnectError(parse_json(rest)?),
        '3' | '5' | '6' => SocketPacket::Ignored,
        other => return Err(CodecError::UnknownPacket(other)),
    };
    Ok(packet)
}

fn decode_event(body: &str) -> Result<WireEvent, CodecError> {
    let Value::Array(mut items) = serde_json::from_str::<Value>(body)? else {
        return Err(CodecError::MalformedEvent);
    };
    if items.is_empty() {
        return Err(CodecError::MalformedEvent);
    }
    let Value::String(name) = items.remove(0) else {
        return Err(CodecError::MalformedEvent);
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.swap_remove(0)
    };
    Ok(WireEvent { name, payload })
}

/// `/admin,rest` -> `rest`; the default namespace has no prefix.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map(|(_, rest)| rest).unwrap_or("")
    } else {
        body
    }
}

fn parse_json(body: &str) -> Result<Value, CodecError> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

/// Encode an event frame: `42["name",payload]`.
pub fn encode_event(event: &WireEvent) -> Result<String, CodecError> {
    let body = serde_json::to_string(&(event.name.as_str(), &event.payload))?;
    Ok(format!("42{body}"))
}
