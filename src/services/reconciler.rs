//! Applies server snapshots onto the session and drives local time-up.

use tracing::{debug, info};

use crate::{
    dto::{events::SummaryEvent, snapshot::RoomSnapshot},
    puzzles::ActiveForm,
    state::{
        RoomSession,
        clock::ClockTick,
        state_machine::{RoomEvent, RoomPhase},
    },
};

/// Replace everything displayed with `snapshot`. Returns `false` when it was ignored.
///
/// Nothing is merged with the previous snapshot: the form is re-rendered from scratch, dropping
/// any local edit, and the clock restarts from `remaining`.
pub fn apply_snapshot(session: &mut RoomSession, snapshot: RoomSnapshot) -> bool {
    let event = if snapshot.finished {
        RoomEvent::FinishedSnapshot
    } else if snapshot.prompt.is_some() {
        RoomEvent::PuzzleSnapshot
    } else {
        RoomEvent::IdleSnapshot
    };

    let previous = session.machine.phase();
    let phase = match session.machine.apply(event) {
        Ok(phase) => phase,
        Err(err) => {
            debug!(room = %session.room, error = %err, "ignoring snapshot");
            return false;
        }
    };
    if phase != previous {
        info!(room = %session.room, from = ?previous, to = ?phase, "room phase changed");
    }

    if snapshot.finished {
        session.clock.stop();
        session.form = ActiveForm::empty();
        session.time_up = false;
    } else {
        let shown = session.clock.start(snapshot.remaining);
        session.form = snapshot
            .prompt
            .as_ref()
            .map(|prompt| session.registry.render(prompt))
            .unwrap_or_default();
        // A running puzzle already at zero is an underflow, not a finish.
        session.time_up = shown == 0 && phase == RoomPhase::ActivePuzzle;
        session.summary = None;
    }

    session.snapshot = Some(snapshot);
    true
}

/// Advance the local countdown by one second.
pub fn on_clock_tick(session: &mut RoomSession) -> Option<ClockTick> {
    let tick = session.clock.tick()?;
    if tick == ClockTick::Expired && session.machine.phase() == RoomPhase::ActivePuzzle {
        info!(room = %session.room, "local countdown reached zero; waiting for the server");
        session.time_up = true;
    }
    Some(tick)
}

/// Keep the end-of-game debrief for the finish banner.
pub fn handle_summary(session: &mut RoomSession, summary: SummaryEvent) {
    if !session.is_authenticated() {
        debug!(room = %session.room, "ignoring summary received before authentication");
        return;
    }
    session.summary = Some(summary);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        dto::events::AuthResult,
        services::auth_gate::{handle_auth_result, request_auth},
    };

    fn authenticated() -> RoomSession {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4F2A9C").unwrap();
        handle_auth_result(
            &mut session,
            AuthResult {
                ok: true,
                msg: "ok".into(),
            },
        );
        session
    }

    fn snapshot(value: serde_json::Value) -> RoomSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn riddle(remaining: i64) -> RoomSnapshot {
        snapshot(json!({
            "finished": false,
            "remaining": remaining,
            "hints": {"total": 3, "used": 1},
            "prompt": {"type": "riddle", "title": "Salle 2", "instruction": "Qui suis-je ?"}
        }))
    }

    #[test]
    fn snapshot_before_auth_is_ignored() {
        let mut session = RoomSession::new("A1");
        assert!(!apply_snapshot(&mut session, riddle(90)));
        assert!(session.snapshot().is_none());
        assert_eq!(session.clock().remaining(), 0);
    }

    #[test]
    fn active_snapshot_starts_clock_and_renders_form() {
        let mut session = authenticated();
        assert!(apply_snapshot(&mut session, riddle(90)));
        assert_eq!(session.phase(), RoomPhase::ActivePuzzle);
        assert_eq!(session.clock().remaining(), 90);
        assert!(session.clock().is_running());
        assert_eq!(session.form().variant_name(), Some("riddle"));
    }

    #[test]
    fn new_snapshot_discards_local_edits() {
        let mut session = authenticated();
        apply_snapshot(&mut session, riddle(90));
        session.form.set_value("answer", "abeille").unwrap();

        apply_snapshot(&mut session, riddle(80));
        assert_eq!(
            serde_json::Value::Object(session.form().capture()),
            json!({"answer": ""})
        );
        assert_eq!(session.clock().remaining(), 80);
    }

    #[test]
    fn expiry_sets_time_up_until_next_snapshot() {
        let mut session = authenticated();
        apply_snapshot(&mut session, riddle(2));
        assert_eq!(on_clock_tick(&mut session), Some(ClockTick::Running(1)));
        assert_eq!(on_clock_tick(&mut session), Some(ClockTick::Expired));
        assert!(session.is_time_up());
        assert!(!session.controls().submit);
        assert!(session.controls().hint);
        assert_eq!(on_clock_tick(&mut session), None);

        apply_snapshot(&mut session, riddle(60));
        assert!(!session.is_time_up());
        assert!(session.controls().submit);
    }

    #[test]
    fn finished_snapshot_stops_clock_and_clears_form() {
        let mut session = authenticated();
        apply_snapshot(&mut session, riddle(90));
        apply_snapshot(
            &mut session,
            snapshot(json!({"finished": true, "success": true, "score": 42})),
        );

        assert_eq!(session.phase(), RoomPhase::Finished);
        assert!(!session.clock().is_running());
        assert!(session.form().descriptor().is_empty());
        assert_eq!(on_clock_tick(&mut session), None);
    }

    #[test]
    fn idle_snapshot_waits_for_prompt() {
        let mut session = authenticated();
        apply_snapshot(&mut session, snapshot(json!({"remaining": 1800})));
        assert_eq!(session.phase(), RoomPhase::AwaitingPrompt);
        assert!(!session.is_time_up());
    }

    #[test]
    fn summary_is_cleared_by_the_next_active_snapshot() {
        let mut session = authenticated();
        handle_summary(&mut session, SummaryEvent::default());
        assert!(session.summary().is_some());
        apply_snapshot(&mut session, riddle(30));
        assert!(session.summary().is_none());
    }
}
