//! Room phase as published to front-ends.

use serde::Serialize;

use crate::state::state_machine::RoomPhase;

/// Room phase as exposed to the view layer.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// Waiting for the player code to be accepted.
    Locked,
    /// Authenticated, no puzzle pushed yet.
    Waiting,
    /// A puzzle is on screen.
    Playing,
    /// Mission over, waiting for a reset.
    Finished,
}

impl From<&RoomPhase> for VisibleRoomPhase {
    fn from(value: &RoomPhase) -> Self {
        match value {
            RoomPhase::Unauthenticated => VisibleRoomPhase::Locked,
            RoomPhase::AwaitingPrompt => VisibleRoomPhase::Waiting,
            RoomPhase::ActivePuzzle => VisibleRoomPhase::Playing,
            RoomPhase::Finished => VisibleRoomPhase::Finished,
        }
    }
}
