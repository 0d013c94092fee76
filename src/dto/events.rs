//! Named events exchanged with the game server and their payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dto::{null_as_default, snapshot::RoomSnapshot};
use crate::puzzles::AnswerPayload;

/// Player code submission.
pub const EVENT_AUTH: &str = "auth";
/// Server verdict on a player code.
pub const EVENT_AUTH_RESULT: &str = "auth_result";
/// Start the mission.
pub const EVENT_START: &str = "start";
/// Ask for a hint.
pub const EVENT_HINT: &str = "hint";
/// Submit an answer.
pub const EVENT_SUBMIT: &str = "submit";
/// Reset a finished room.
pub const EVENT_REPLAY: &str = "replay";
/// Outbound chat line.
pub const EVENT_CHAT_MESSAGE: &str = "chat_message";
/// Inbound chat line.
pub const EVENT_CHAT: &str = "chat";
/// Full room snapshot.
pub const EVENT_STATE: &str = "state";
/// End-of-game debrief.
pub const EVENT_SUMMARY: &str = "summary";

/// A named event as carried by the push-messaging transport.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    /// Event name, e.g. `state` or `submit`.
    pub name: String,
    /// JSON payload attached to the event.
    pub payload: Value,
}

impl WireEvent {
    /// Build a wire event by serialising `payload`.
    pub fn json<T>(name: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            name: name.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Credentials sent once the player code passed local validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Room being joined.
    pub room: String,
    /// Display name, never blank.
    pub name: String,
    /// Upper-cased player code.
    pub player_code: String,
}

/// Payload shared by the bare room commands (`start`, `hint`, `replay`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomRequest {
    /// Target room.
    pub room: String,
}

/// Answer submission for the active puzzle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    /// Target room.
    pub room: String,
    /// Answer captured from the active form.
    pub payload: AnswerPayload,
}

/// Outbound free-text room message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatOutbound {
    /// Target room.
    pub room: String,
    /// Sender display name.
    pub name: String,
    /// Trimmed message text.
    pub text: String,
}

/// Server verdict for an `auth` request. A missing `ok` keeps the gate closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AuthResult {
    /// Whether the code was accepted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    /// Human-readable verdict.
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
}

/// Inbound chat line, either relayed from a player or emitted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChatInbound {
    /// Sent by the server itself.
    #[serde(default, deserialize_with = "null_as_default")]
    pub system: bool,
    /// Line as the server formatted it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
}

/// End-of-game debrief pushed alongside the final snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SummaryEvent {
    /// Debrief per solved stage.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SummaryItem>,
    /// Final score, when sent with the debrief.
    #[serde(default)]
    pub score: Option<crate::dto::snapshot::ScoreField>,
}

/// One solved stage inside a [`SummaryEvent`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SummaryItem {
    /// Zero-based stage index.
    #[serde(default)]
    pub stage: Option<u32>,
    /// Stage title.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// What the stage was meant to teach.
    #[serde(default, deserialize_with = "null_as_default")]
    pub debrief: String,
}

/// Events the client emits towards the game server.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Authentication handshake.
    Auth(AuthRequest),
    /// Start (or restart) the mission.
    Start(RoomRequest),
    /// Ask for the next hint of the active puzzle.
    Hint(RoomRequest),
    /// Submit an answer for the active puzzle.
    Submit(SubmitRequest),
    /// Ask the server to reset a finished room.
    Replay(RoomRequest),
    /// Relay a chat message to the room.
    Chat(ChatOutbound),
}

impl OutboundEvent {
    /// Transport event name for this message.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth(_) => EVENT_AUTH,
            Self::Start(_) => EVENT_START,
            Self::Hint(_) => EVENT_HINT,
            Self::Submit(_) => EVENT_SUBMIT,
            Self::Replay(_) => EVENT_REPLAY,
            Self::Chat(_) => EVENT_CHAT_MESSAGE,
        }
    }

    /// Serialise into the generic transport representation.
    pub fn to_wire(&self) -> serde_json::Result<WireEvent> {
        let name = self.name();
        match self {
            Self::Auth(payload) => WireEvent::json(name, payload),
            Self::Start(payload) | Self::Hint(payload) | Self::Replay(payload) => {
                WireEvent::json(name, payload)
            }
            Self::Submit(payload) => WireEvent::json(name, payload),
            Self::Chat(payload) => WireEvent::json(name, payload),
        }
    }
}

/// Events the server pushes to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Verdict for a previous `auth` request.
    AuthResult(AuthResult),
    /// A chat line for the transcript.
    Chat(ChatInbound),
    /// A full authoritative room snapshot.
    State(Box<RoomSnapshot>),
    /// End-of-game debrief.
    Summary(SummaryEvent),
    /// Any event this client does not know about.
    Unknown(String),
}

impl InboundEvent {
    /// Decode a transport event into its typed form.
    pub fn from_wire(event: WireEvent) -> serde_json::Result<Self> {
        let WireEvent { name, payload } = event;
        let decoded = match name.as_str() {
            EVENT_AUTH_RESULT => Self::AuthResult(serde_json::from_value(payload)?),
            EVENT_CHAT => Self::Chat(serde_json::from_value(payload)?),
            EVENT_STATE => Self::State(Box::new(serde_json::from_value(payload)?)),
            EVENT_SUMMARY => Self::Summary(serde_json::from_value(payload)?),
            _ => Self::Unknown(name),
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn submit_serialises_room_and_payload() {
        let mut payload = AnswerPayload::new();
        payload.insert("answer".into(), json!("ABEILLE"));
        let event = OutboundEvent::Submit(SubmitRequest {
            room: "A1".into(),
            payload,
        });

        let wire = event.to_wire().unwrap();
        assert_eq!(wire.name, "submit");
        assert_eq!(
            wire.payload,
            json!({"room": "A1", "payload": {"answer": "ABEILLE"}})
        );
    }

    #[test]
    fn auth_result_without_ok_is_a_rejection() {
        let event = InboundEvent::from_wire(WireEvent {
            name: "auth_result".into(),
            payload: json!({"msg": "Code joueur invalide."}),
        })
        .unwrap();

        match event {
            InboundEvent::AuthResult(result) => {
                assert!(!result.ok);
                assert_eq!(result.msg, "Code joueur invalide.");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_events_keep_their_name() {
        let event = InboundEvent::from_wire(WireEvent {
            name: "leaderboard".into(),
            payload: Value::Null,
        })
        .unwrap();
        assert_eq!(event, InboundEvent::Unknown("leaderboard".into()));
    }

    #[test]
    fn summary_accepts_detailed_score() {
        let event = InboundEvent::from_wire(WireEvent {
            name: "summary".into(),
            payload: json!({
                "items": [{"stage": 0, "title": "Salle 1", "debrief": "Bravo"}],
                "score": {"total": 2390, "by_stage": [2390], "fails_left": 2}
            }),
        })
        .unwrap();

        let InboundEvent::Summary(summary) = event else {
            panic!("expected a summary");
        };
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.score.map(|score| score.total()), Some(2390.0));
    }
}
