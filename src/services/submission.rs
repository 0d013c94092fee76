//! Answer submission for the active puzzle.

use tracing::debug;

use crate::{
    dto::events::{OutboundEvent, SubmitRequest},
    error::ServiceError,
    state::RoomSession,
    view::Control,
};

/// Capture the active form and wrap it as a `submit` event.
///
/// One event per call: the server decides about duplicates, stale stages and completeness.
pub fn submit(session: &RoomSession) -> Result<OutboundEvent, ServiceError> {
    session.controls().ensure(Control::Submit)?;

    let payload = session.form.capture();
    debug!(
        room = %session.room,
        variant = session.form.variant_name().unwrap_or("none"),
        "submitting answer"
    );
    Ok(OutboundEvent::Submit(SubmitRequest {
        room: session.room.clone(),
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        dto::events::AuthResult,
        services::{
            auth_gate::{handle_auth_result, request_auth},
            reconciler::apply_snapshot,
        },
    };

    fn playing(prompt: Value) -> RoomSession {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4F2A9C").unwrap();
        handle_auth_result(
            &mut session,
            AuthResult {
                ok: true,
                msg: String::new(),
            },
        );
        apply_snapshot(
            &mut session,
            serde_json::from_value(json!({"remaining": 300, "prompt": prompt})).unwrap(),
        );
        session
    }

    fn payload_of(event: OutboundEvent) -> Value {
        match event {
            OutboundEvent::Submit(request) => Value::Object(request.payload),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn submit_is_locked_before_auth() {
        let session = RoomSession::new("A1");
        assert!(matches!(
            submit(&session),
            Err(ServiceError::ControlDisabled(Control::Submit))
        ));
    }

    #[test]
    fn every_click_emits_a_submission() {
        let mut session = playing(json!({"type": "riddle_v2"}));
        session.form.set_value("answer", " Abeille ").unwrap();

        let first = submit(&session).unwrap();
        let second = submit(&session).unwrap();
        assert_eq!(first, second);
        assert_eq!(payload_of(first), json!({"answer": "Abeille"}));
    }

    #[test]
    fn incomplete_classification_is_sent_as_is() {
        let mut session = playing(json!({
            "type": "waste_v2",
            "items": [{"id": "pot", "label": "Pot"}, {"id": "pomme", "label": "Pomme"}],
            "bins": [{"id": "verre", "label": "Verre"}]
        }));
        session.form.set_value("pot", "verre").unwrap();
        assert_eq!(
            payload_of(submit(&session).unwrap()),
            json!({"assign": {"pot": "verre", "pomme": ""}})
        );
    }

    #[test]
    fn unknown_variant_submits_empty_payload() {
        let session = playing(json!({"type": "laser_maze"}));
        let OutboundEvent::Submit(request) = submit(&session).unwrap() else {
            panic!("expected a submission");
        };
        assert_eq!(request.room, "A1");
        assert!(request.payload.is_empty());
    }
}
