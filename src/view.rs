//! Display model derived from the session after every handled event.

use std::fmt;

use serde::Serialize;

use crate::{
    dto::{phase::VisibleRoomPhase, snapshot::ScoreField},
    error::ServiceError,
    puzzles::{FormControl, format_number},
    services::chat_relay::ChatLine,
    state::{
        RoomSession, clock::format_mmss, connection::ConnectionStatus,
        state_machine::RoomPhase,
    },
};

/// Interactive controls gated by authentication and the room phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Credential entry.
    Auth,
    /// Start the mission.
    Start,
    /// Submit the current answer.
    Submit,
    /// Request a hint.
    Hint,
    /// Send a chat message.
    Chat,
    /// Reset a finished room.
    Replay,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Auth => "auth",
            Control::Start => "start",
            Control::Submit => "submit",
            Control::Hint => "hint",
            Control::Chat => "chat",
            Control::Replay => "replay",
        };
        f.write_str(name)
    }
}

/// Enablement of every gated control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ControlStates {
    /// Credential form.
    pub auth: bool,
    /// Start button.
    pub start: bool,
    /// Submit button.
    pub submit: bool,
    /// Hint button.
    pub hint: bool,
    /// Chat input.
    pub chat: bool,
    /// Replay button.
    pub replay: bool,
}

impl ControlStates {
    /// Whether `control` accepts input.
    pub fn is_enabled(&self, control: Control) -> bool {
        match control {
            Control::Auth => self.auth,
            Control::Start => self.start,
            Control::Submit => self.submit,
            Control::Hint => self.hint,
            Control::Chat => self.chat,
            Control::Replay => self.replay,
        }
    }

    /// Fail with [`ServiceError::ControlDisabled`] when `control` is locked.
    pub fn ensure(&self, control: Control) -> Result<(), ServiceError> {
        if self.is_enabled(control) {
            Ok(())
        } else {
            Err(ServiceError::ControlDisabled(control))
        }
    }
}

/// Rendered form region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    /// Interactive controls in display order.
    pub controls: Vec<FormControl>,
    /// Static lines such as a bins legend.
    pub notes: Vec<String>,
    /// Lines recomputed from the current values.
    pub derived: Vec<String>,
}

/// End-of-mission banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeView {
    /// Whether the team escaped.
    pub success: bool,
    /// Banner text.
    pub headline: String,
    /// Formatted final score.
    pub score: Option<String>,
    /// One line per solved stage.
    pub debrief: Vec<String>,
}

/// Everything the front-end needs to draw the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    /// Transport status.
    pub connection: ConnectionStatus,
    /// Coarse room phase.
    pub phase: VisibleRoomPhase,
    /// `Team <label>` when the server names the team.
    pub header: Option<String>,
    /// `Stage n/total` progress.
    pub stage: Option<String>,
    /// Local countdown as `MM:SS`.
    pub timer: String,
    /// The countdown reached zero locally.
    pub time_up: bool,
    /// Puzzle or placeholder title.
    pub title: String,
    /// Instruction split into lines.
    pub instruction: Vec<String>,
    /// Hint button label with the remaining count.
    pub hint_label: String,
    /// Submissions left on the stage, when tracked.
    pub attempts_left: Option<u32>,
    /// Active puzzle form.
    pub form: FormView,
    /// Enablement of the gated controls.
    pub controls: ControlStates,
    /// Set once the mission is over.
    pub outcome: Option<OutcomeView>,
    /// Local message for the player.
    pub notice: Option<String>,
    /// Chat and system lines in arrival order.
    pub transcript: Vec<ChatLine>,
}

impl RoomView {
    /// Project the session into display state.
    pub fn from_session(session: &RoomSession) -> Self {
        let phase = session.phase();
        let snapshot = session.snapshot();
        let finished = phase == RoomPhase::Finished;

        let header = snapshot
            .and_then(|snapshot| snapshot.room_label.as_deref())
            .filter(|label| !label.is_empty())
            .map(|label| format!("Team {label}"));
        let stage = snapshot.and_then(|snapshot| match (snapshot.stage, snapshot.total) {
            (Some(stage), Some(total)) if total > 0 => {
                Some(format!("Stage {}/{}", stage.saturating_add(1).min(total), total))
            }
            _ => None,
        });

        let hint_label = match snapshot {
            Some(snapshot) if !finished => format!("Hint ({} left)", snapshot.hints.remaining()),
            _ => "Hint".to_string(),
        };

        let outcome = finished.then(|| outcome(session));
        let (title, instruction) = match phase {
            RoomPhase::Unauthenticated => (
                "Enter your player code to join the room".to_string(),
                Vec::new(),
            ),
            RoomPhase::AwaitingPrompt => ("Waiting for the mission to start".to_string(), Vec::new()),
            RoomPhase::ActivePuzzle => {
                let prompt = snapshot.and_then(|snapshot| snapshot.prompt.as_ref());
                (
                    prompt
                        .and_then(|prompt| prompt.title.clone())
                        .filter(|title| !title.is_empty())
                        .unwrap_or_else(|| "Room".to_string()),
                    prompt
                        .map(|prompt| prompt.instruction_lines())
                        .unwrap_or_default(),
                )
            }
            RoomPhase::Finished => (
                outcome
                    .as_ref()
                    .map(|outcome| outcome.headline.clone())
                    .unwrap_or_default(),
                vec!["Play again?".to_string()],
            ),
        };

        let attempts_left = (phase == RoomPhase::ActivePuzzle)
            .then(|| {
                snapshot
                    .and_then(|snapshot| snapshot.score.as_ref())
                    .and_then(ScoreField::fails_left)
            })
            .flatten();

        let form = session.form();
        Self {
            connection: session.connection(),
            phase: VisibleRoomPhase::from(&phase),
            header,
            stage,
            timer: format_mmss(session.clock().remaining()),
            time_up: session.is_time_up(),
            title,
            instruction,
            hint_label,
            attempts_left,
            form: FormView {
                controls: form.descriptor().controls.values().cloned().collect(),
                notes: form.descriptor().notes.clone(),
                derived: form.derived().to_vec(),
            },
            controls: session.controls(),
            outcome,
            notice: session.notice().map(str::to_string),
            transcript: session.transcript().to_vec(),
        }
    }
}

fn outcome(session: &RoomSession) -> OutcomeView {
    let snapshot = session.snapshot();
    let success = snapshot
        .and_then(|snapshot| snapshot.success)
        .unwrap_or(false);
    let score = snapshot
        .and_then(|snapshot| snapshot.score.as_ref())
        .or_else(|| session.summary().and_then(|summary| summary.score.as_ref()))
        .map(|score| format!("{} pts", format_number(score.total())));
    let debrief = session
        .summary()
        .map(|summary| {
            summary
                .items
                .iter()
                .map(|item| format!("{}: {}", item.title, item.debrief))
                .collect()
        })
        .unwrap_or_default();

    OutcomeView {
        success,
        headline: if success {
            "✅ Victory!".to_string()
        } else {
            "⛔ Mission over.".to_string()
        },
        score,
        debrief,
    }
}

impl fmt::Display for RoomView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut banner = vec![format!("{:?}", self.connection).to_lowercase()];
        banner.extend(self.header.clone());
        banner.extend(self.stage.clone());
        writeln!(f, "── {} ──", banner.join(" · "))?;

        write!(f, "⏳ {}   {}", self.timer, self.hint_label)?;
        if let Some(left) = self.attempts_left {
            write!(f, "   attempts left: {left}")?;
        }
        if self.time_up {
            write!(f, "   time's up, waiting for the server")?;
        }
        writeln!(f)?;

        writeln!(f, "## {}", self.title)?;
        for line in &self.instruction {
            writeln!(f, "{line}")?;
        }

        for control in &self.form.controls {
            match control {
                FormControl::Choice {
                    key,
                    label,
                    icon,
                    options,
                    selected,
                } => {
                    let choices = options
                        .iter()
                        .map(|option| option.id.as_str())
                        .collect::<Vec<_>>()
                        .join("|");
                    writeln!(
                        f,
                        "  [{key}] {}{label} -> {} ({choices})",
                        icon.as_deref().map(|icon| format!("{icon} ")).unwrap_or_default(),
                        selected.as_deref().unwrap_or("—"),
                    )?;
                }
                FormControl::Text {
                    key,
                    placeholder,
                    value,
                } => {
                    if value.is_empty() {
                        writeln!(f, "  [{key}] ({placeholder})")?;
                    } else {
                        writeln!(f, "  [{key}] {value}")?;
                    }
                }
                FormControl::Range {
                    key,
                    label,
                    min,
                    max,
                    value,
                    ..
                } => {
                    writeln!(
                        f,
                        "  [{key}] {label}: {} ({}..{})",
                        format_number(*value),
                        format_number(*min),
                        format_number(*max)
                    )?;
                }
            }
        }
        for note in self.form.notes.iter().chain(&self.form.derived) {
            writeln!(f, "  {note}")?;
        }

        if let Some(outcome) = &self.outcome {
            if let Some(score) = &outcome.score {
                writeln!(f, "Score: {score}")?;
            }
            for line in &outcome.debrief {
                writeln!(f, "  🎓 {line}")?;
            }
        }

        let enabled = [
            Control::Auth,
            Control::Start,
            Control::Submit,
            Control::Hint,
            Control::Chat,
            Control::Replay,
        ]
        .into_iter()
        .filter(|control| self.controls.is_enabled(*control))
        .map(|control| control.to_string())
        .collect::<Vec<_>>();
        writeln!(f, "controls: {}", enabled.join(" "))?;

        if let Some(notice) = &self.notice {
            writeln!(f, "! {notice}")?;
        }
        Ok(())
    }
}
