//! Room chat.

use std::fmt;

use serde::Serialize;

use crate::{
    dto::events::{ChatInbound, ChatOutbound, OutboundEvent},
    error::ServiceError,
    state::RoomSession,
    view::Control,
};

/// One transcript entry, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    /// Emitted by the server rather than relayed from a player.
    pub system: bool,
    /// Line text without prefix.
    pub text: String,
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.system {
            write!(f, "ℹ️ {}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// Build the `chat_message` event. Blank text is a silent no-op.
pub fn send(session: &RoomSession, text: &str) -> Result<Option<OutboundEvent>, ServiceError> {
    session.controls().ensure(Control::Chat)?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(OutboundEvent::Chat(ChatOutbound {
        room: session.room.clone(),
        name: session.gate.display_name().to_string(),
        text: text.to_string(),
    })))
}

/// Append an inbound message.
pub fn receive(session: &mut RoomSession, message: ChatInbound) {
    session.transcript.push(ChatLine {
        system: message.system,
        text: message.msg,
    });
}

/// Append a server-originated line; empty messages are skipped.
pub(crate) fn push_system(session: &mut RoomSession, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    session.transcript.push(ChatLine {
        system: true,
        text: text.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::events::AuthResult;
    use crate::services::auth_gate::{handle_auth_result, request_auth};

    fn authenticated() -> RoomSession {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4F2A9C").unwrap();
        handle_auth_result(
            &mut session,
            AuthResult {
                ok: true,
                msg: String::new(),
            },
        );
        session
    }

    #[test]
    fn sending_requires_authentication() {
        let session = RoomSession::new("A1");
        assert!(matches!(
            send(&session, "hello"),
            Err(ServiceError::ControlDisabled(Control::Chat))
        ));
    }

    #[test]
    fn blank_text_is_a_no_op() {
        let session = authenticated();
        assert_eq!(send(&session, "  \n").unwrap(), None);
    }

    #[test]
    fn sends_trimmed_text_with_room_and_name() {
        let session = authenticated();
        assert_eq!(
            send(&session, "  on a trouvé le code ").unwrap(),
            Some(OutboundEvent::Chat(ChatOutbound {
                room: "A1".into(),
                name: "Ada".into(),
                text: "on a trouvé le code".into(),
            }))
        );
    }

    #[test]
    fn inbound_lines_keep_arrival_order_and_duplicates() {
        let mut session = RoomSession::new("A1");
        for (system, msg) in [(false, "salut"), (true, "Indice utilisé"), (false, "salut")] {
            receive(
                &mut session,
                ChatInbound {
                    system,
                    msg: msg.into(),
                },
            );
        }
        let rendered = session
            .transcript()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(rendered, ["salut", "ℹ️ Indice utilisé", "salut"]);
    }
}
