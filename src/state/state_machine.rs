//! Phase tracking for the room as seen by this client.

use thiserror::Error;

/// High-level phases of the room as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Player code not accepted yet; every interactive control is locked.
    Unauthenticated,
    /// Accepted by the server but no puzzle has been pushed yet.
    AwaitingPrompt,
    /// A puzzle is rendered and accepts submissions.
    ActivePuzzle,
    /// The server declared the mission over; only a reset leaves this phase.
    Finished,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// The server accepted the player code.
    AuthAccepted,
    /// Snapshot for a running room without a prompt.
    IdleSnapshot,
    /// Snapshot carrying an active puzzle.
    PuzzleSnapshot,
    /// Snapshot with the terminal flag set.
    FinishedSnapshot,
    /// The room was reset out-of-band or a re-join was refused; the player must authenticate again.
    SignedOut,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Reconciler state machine driven by authentication and inbound snapshots.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoomPhase,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Unauthenticated,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine locked behind authentication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Apply an event and return the resulting phase.
    pub fn apply(&mut self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        self.phase = self.compute_transition(event)?;
        Ok(self.phase)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (_, RoomEvent::SignedOut) => RoomPhase::Unauthenticated,
            (RoomPhase::Unauthenticated, RoomEvent::AuthAccepted) => RoomPhase::AwaitingPrompt,
            // Re-acceptance (e.g. after a reconnect) keeps whatever the room was showing.
            (phase, RoomEvent::AuthAccepted) => phase,
            (RoomPhase::Unauthenticated, event) => {
                return Err(InvalidTransition {
                    from: RoomPhase::Unauthenticated,
                    event,
                });
            }
            (_, RoomEvent::IdleSnapshot) => RoomPhase::AwaitingPrompt,
            (_, RoomEvent::PuzzleSnapshot) => RoomPhase::ActivePuzzle,
            (_, RoomEvent::FinishedSnapshot) => RoomPhase::Finished,
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoomStateMachine, event: RoomEvent) -> RoomPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_unauthenticated() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.phase(), RoomPhase::Unauthenticated);
    }

    #[test]
    fn full_happy_path_through_room() {
        let mut sm = RoomStateMachine::new();

        assert_eq!(
            apply(&mut sm, RoomEvent::AuthAccepted),
            RoomPhase::AwaitingPrompt
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::PuzzleSnapshot),
            RoomPhase::ActivePuzzle
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::PuzzleSnapshot),
            RoomPhase::ActivePuzzle
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::FinishedSnapshot),
            RoomPhase::Finished
        );
        // A replay produces a fresh running snapshot.
        assert_eq!(
            apply(&mut sm, RoomEvent::PuzzleSnapshot),
            RoomPhase::ActivePuzzle
        );
    }

    #[test]
    fn snapshots_before_auth_are_rejected() {
        let mut sm = RoomStateMachine::new();
        let err = sm.apply(RoomEvent::PuzzleSnapshot).unwrap_err();
        assert_eq!(err.from, RoomPhase::Unauthenticated);
        assert_eq!(err.event, RoomEvent::PuzzleSnapshot);
        assert_eq!(sm.phase(), RoomPhase::Unauthenticated);
    }

    #[test]
    fn re_acceptance_is_idempotent() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::AuthAccepted);
        apply(&mut sm, RoomEvent::PuzzleSnapshot);

        assert_eq!(
            apply(&mut sm, RoomEvent::AuthAccepted),
            RoomPhase::ActivePuzzle
        );
        apply(&mut sm, RoomEvent::FinishedSnapshot);
        assert_eq!(apply(&mut sm, RoomEvent::AuthAccepted), RoomPhase::Finished);
    }

    #[test]
    fn sign_out_locks_again() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::AuthAccepted);
        apply(&mut sm, RoomEvent::FinishedSnapshot);
        assert_eq!(
            apply(&mut sm, RoomEvent::SignedOut),
            RoomPhase::Unauthenticated
        );
    }
}
