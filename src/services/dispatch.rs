//! Routing of player commands and server events onto the session handlers.

use tracing::{debug, warn};

use crate::{
    config::ResetStrategy,
    dto::events::{InboundEvent, OutboundEvent, RoomRequest},
    error::ServiceError,
    services::{auth_gate, chat_relay, reconciler, submission},
    state::RoomSession,
    view::Control,
};

/// A player action coming from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Submit the credential form.
    Authenticate {
        /// Display name, may be blank.
        name: String,
        /// Raw player code as typed.
        code: String,
    },
    /// Start the mission.
    Start,
    /// Ask for a hint.
    Hint,
    /// Submit the active form.
    Submit,
    /// Change one control of the active form.
    SetValue {
        /// Control key.
        key: String,
        /// Raw value as typed.
        value: String,
    },
    /// Send a chat message.
    Chat(String),
    /// Reset the finished room.
    Replay,
}

/// Side effect requested by a handler; performed by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send an event to the server.
    Emit(OutboundEvent),
    /// Reload the room page with the reset marker.
    ReloadRoom,
}

/// Apply a player command and return the side effect it requires, if any.
pub fn handle_command(
    session: &mut RoomSession,
    command: Command,
) -> Result<Option<Effect>, ServiceError> {
    let effect = match command {
        Command::Authenticate { name, code } => {
            Some(Effect::Emit(auth_gate::request_auth(session, &name, &code)?))
        }
        Command::Start => {
            session.controls().ensure(Control::Start)?;
            Some(Effect::Emit(OutboundEvent::Start(room_request(session))))
        }
        Command::Hint => {
            session.controls().ensure(Control::Hint)?;
            Some(Effect::Emit(OutboundEvent::Hint(room_request(session))))
        }
        Command::Submit => Some(Effect::Emit(submission::submit(session)?)),
        Command::SetValue { key, value } => {
            session.form.set_value(&key, &value)?;
            None
        }
        Command::Chat(text) => chat_relay::send(session, &text)?.map(Effect::Emit),
        Command::Replay => {
            session.controls().ensure(Control::Replay)?;
            match session.reset_strategy {
                ResetStrategy::Transport => {
                    Some(Effect::Emit(OutboundEvent::Replay(room_request(session))))
                }
                ResetStrategy::Reload => Some(Effect::ReloadRoom),
            }
        }
    };
    Ok(effect)
}

/// [`handle_command`] with errors logged and turned into the session notice.
pub fn execute(session: &mut RoomSession, command: Command) -> Option<Effect> {
    let is_auth = matches!(command, Command::Authenticate { .. });
    match handle_command(session, command) {
        Ok(effect) => {
            if !is_auth {
                session.notice = None;
            }
            effect
        }
        Err(ServiceError::ControlDisabled(control)) => {
            debug!(room = %session.room, %control, "ignoring disabled control");
            None
        }
        Err(err) => {
            warn!(room = %session.room, error = %err, "command failed");
            // Auth errors already set their own notice.
            if !is_auth {
                session.notice = Some(err.to_string());
            }
            None
        }
    }
}

/// Apply a server event to the session.
pub fn handle_inbound(session: &mut RoomSession, event: InboundEvent) {
    match event {
        InboundEvent::AuthResult(result) => auth_gate::handle_auth_result(session, result),
        InboundEvent::Chat(message) => chat_relay::receive(session, message),
        InboundEvent::State(snapshot) => {
            reconciler::apply_snapshot(session, *snapshot);
        }
        InboundEvent::Summary(summary) => reconciler::handle_summary(session, summary),
        InboundEvent::Unknown(name) => {
            debug!(room = %session.room, event = %name, "ignoring unknown server event");
        }
    }
}

fn room_request(session: &RoomSession) -> RoomRequest {
    RoomRequest {
        room: session.room.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dto::events::{AuthResult, WireEvent};

    fn inbound(name: &str, payload: serde_json::Value) -> InboundEvent {
        InboundEvent::from_wire(WireEvent {
            name: name.into(),
            payload,
        })
        .unwrap()
    }

    fn authenticated(strategy: ResetStrategy) -> RoomSession {
        let mut session = RoomSession::new("A1").with_reset_strategy(strategy);
        handle_command(
            &mut session,
            Command::Authenticate {
                name: "Ada".into(),
                code: "4f2a9c".into(),
            },
        )
        .unwrap();
        handle_inbound(
            &mut session,
            InboundEvent::AuthResult(AuthResult {
                ok: true,
                msg: "Bienvenue".into(),
            }),
        );
        session
    }

    #[test]
    fn gated_commands_have_no_effect_before_auth() {
        let mut session = RoomSession::new("A1");
        for command in [
            Command::Start,
            Command::Hint,
            Command::Submit,
            Command::Chat("hello".into()),
            Command::Replay,
        ] {
            assert_eq!(execute(&mut session, command), None);
        }
        assert!(session.notice().is_none());
    }

    #[test]
    fn start_and_hint_carry_the_room() {
        let mut session = authenticated(ResetStrategy::Transport);
        assert_eq!(
            execute(&mut session, Command::Hint),
            Some(Effect::Emit(OutboundEvent::Hint(RoomRequest {
                room: "A1".into()
            })))
        );
        assert!(matches!(
            execute(&mut session, Command::Start),
            Some(Effect::Emit(OutboundEvent::Start(_)))
        ));
    }

    #[test]
    fn replay_follows_reset_strategy() {
        let finished = json!({"finished": true, "success": true, "score": 42});

        let mut session = authenticated(ResetStrategy::Transport);
        assert_eq!(execute(&mut session, Command::Replay), None);
        handle_inbound(&mut session, inbound("state", finished.clone()));
        assert!(matches!(
            execute(&mut session, Command::Replay),
            Some(Effect::Emit(OutboundEvent::Replay(_)))
        ));

        let mut session = authenticated(ResetStrategy::Reload);
        handle_inbound(&mut session, inbound("state", finished));
        assert_eq!(
            execute(&mut session, Command::Replay),
            Some(Effect::ReloadRoom)
        );
    }

    #[test]
    fn bad_form_value_becomes_a_notice() {
        let mut session = authenticated(ResetStrategy::Transport);
        handle_inbound(
            &mut session,
            inbound(
                "state",
                json!({"remaining": 60, "prompt": {"type": "energy_180", "min": 0, "max": 60}}),
            ),
        );
        assert_eq!(
            execute(
                &mut session,
                Command::SetValue {
                    key: "fossil".into(),
                    value: "lots".into()
                }
            ),
            None
        );
        assert!(session.notice().unwrap().contains("fossil"));

        execute(
            &mut session,
            Command::SetValue {
                key: "fossil".into(),
                value: "30".into(),
            },
        );
        assert!(session.notice().is_none());
    }

    #[test]
    fn unknown_server_events_are_ignored() {
        let mut session = authenticated(ResetStrategy::Transport);
        let before = session.view();
        handle_inbound(&mut session, inbound("leaderboard", json!([1, 2])));
        assert_eq!(session.view(), before);
    }
}
