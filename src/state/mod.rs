//! Client-side room state: the session context and the state machines it owns.

/// Local countdown between snapshots.
pub mod clock;
/// Connection Manager state machine.
pub mod connection;
/// Room phase state machine.
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::{ClientConfig, ResetStrategy},
    dto::{events::SummaryEvent, snapshot::RoomSnapshot},
    puzzles::{ActiveForm, VariantRegistry},
    services::{auth_gate::AuthGate, chat_relay::ChatLine},
    view::{ControlStates, RoomView},
};

use self::{
    clock::LocalClock,
    connection::ConnectionStatus,
    state_machine::{RoomPhase, RoomStateMachine},
};

/// Everything one client instance knows about its room.
///
/// Owned by a single event loop; handlers in [`crate::services`] take it by `&mut` and return
/// the events to emit. Several sessions can live side by side in a test.
#[derive(Debug)]
pub struct RoomSession {
    pub(crate) room: String,
    pub(crate) reset_strategy: ResetStrategy,
    pub(crate) registry: Arc<VariantRegistry>,
    pub(crate) gate: AuthGate,
    pub(crate) machine: RoomStateMachine,
    pub(crate) clock: LocalClock,
    pub(crate) form: ActiveForm,
    pub(crate) transcript: Vec<ChatLine>,
    pub(crate) snapshot: Option<RoomSnapshot>,
    pub(crate) summary: Option<SummaryEvent>,
    pub(crate) notice: Option<String>,
    pub(crate) time_up: bool,
    pub(crate) connection: ConnectionStatus,
}

impl RoomSession {
    /// Fresh, unauthenticated session for `room` with the built-in puzzle variants.
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            reset_strategy: ResetStrategy::default(),
            registry: Arc::new(VariantRegistry::with_builtin()),
            gate: AuthGate::default(),
            machine: RoomStateMachine::new(),
            clock: LocalClock::new(),
            form: ActiveForm::empty(),
            transcript: Vec::new(),
            snapshot: None,
            summary: None,
            notice: None,
            time_up: false,
            connection: ConnectionStatus::Disconnected,
        }
    }

    /// Session for `room` using the configured reset strategy.
    pub fn from_config(config: &ClientConfig, room: impl Into<String>) -> Self {
        Self::new(room).with_reset_strategy(config.reset_strategy)
    }

    /// Replace the puzzle variant registry.
    pub fn with_registry(mut self, registry: VariantRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Choose how the replay control resets the room.
    pub fn with_reset_strategy(mut self, strategy: ResetStrategy) -> Self {
        self.reset_strategy = strategy;
        self
    }

    /// Room code this session joins.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// How the replay control resets the room.
    pub fn reset_strategy(&self) -> ResetStrategy {
        self.reset_strategy
    }

    /// Current reconciler phase.
    pub fn phase(&self) -> RoomPhase {
        self.machine.phase()
    }

    /// Whether the server accepted the player code.
    pub fn is_authenticated(&self) -> bool {
        self.gate.is_accepted()
    }

    /// Local countdown.
    pub fn clock(&self) -> &LocalClock {
        &self.clock
    }

    /// Form of the active puzzle; empty when none.
    pub fn form(&self) -> &ActiveForm {
        &self.form
    }

    /// Chat and system lines received so far.
    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    /// Latest snapshot applied, if any.
    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        self.snapshot.as_ref()
    }

    /// Debrief received after the mission ended.
    pub fn summary(&self) -> Option<&SummaryEvent> {
        self.summary.as_ref()
    }

    /// Last blocking local message (e.g. a refused player code).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The local countdown hit zero and no snapshot has arrived since.
    pub fn is_time_up(&self) -> bool {
        self.time_up
    }

    /// Transport status last reported by the runtime.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub(crate) fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    /// Enablement of every gated control for the current state.
    pub fn controls(&self) -> ControlStates {
        let authed = self.gate.is_accepted();
        let finished = self.phase() == RoomPhase::Finished;
        ControlStates {
            auth: !authed,
            start: authed && !finished,
            submit: authed && !finished && !self.time_up,
            hint: authed && !finished,
            chat: authed,
            replay: authed && finished,
        }
    }

    /// Display model for the current state.
    pub fn view(&self) -> RoomView {
        RoomView::from_session(self)
    }
}
