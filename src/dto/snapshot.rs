//! Authoritative room snapshot pushed on the `state` event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dto::null_as_default;

/// Complete authoritative room state pushed by the server on every change.
///
/// A snapshot is never merged with its predecessor: the latest one received is the sole truth.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RoomSnapshot {
    /// Terminal flag; `success`/`score` are only meaningful once it is set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub finished: bool,
    /// Mission outcome once finished.
    #[serde(default)]
    pub success: Option<bool>,
    /// Authoritative countdown in seconds at the time the snapshot was produced.
    #[serde(default, deserialize_with = "null_as_default")]
    pub remaining: i64,
    /// Score so far.
    #[serde(default)]
    pub score: Option<ScoreField>,
    /// Team label shown in the header.
    #[serde(default)]
    pub room_label: Option<String>,
    /// Hint usage for the current stage.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hints: HintCounter,
    /// Active puzzle, present only while the room is not finished.
    #[serde(default)]
    pub prompt: Option<PuzzlePrompt>,
    /// Zero-based index of the current stage.
    #[serde(default)]
    pub stage: Option<u32>,
    /// Number of stages in the mission.
    #[serde(default)]
    pub total: Option<u32>,
}

/// Hint usage for the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct HintCounter {
    /// Hints available on the stage.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: i64,
    /// Hints already taken.
    #[serde(default, deserialize_with = "null_as_default")]
    pub used: i64,
}

impl HintCounter {
    /// Hints still available, clamped at zero when `used` exceeds `total`.
    pub fn remaining(&self) -> u32 {
        let left = self.total.saturating_sub(self.used).max(0);
        u32::try_from(left).unwrap_or(u32::MAX)
    }
}

/// Score as sent by the server: either a bare number or a per-stage breakdown.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScoreField {
    /// Plain final score.
    Points(f64),
    /// Running total with per-stage detail.
    Detailed(ScoreBreakdown),
}

/// Per-stage score detail.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ScoreBreakdown {
    /// Running total.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: f64,
    /// Points per solved stage.
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_stage: Vec<f64>,
    /// Submissions left on the current stage before it is skipped.
    #[serde(default)]
    pub fails_left: Option<u32>,
}

impl ScoreField {
    /// Total points regardless of the representation.
    pub fn total(&self) -> f64 {
        match self {
            Self::Points(points) => *points,
            Self::Detailed(detail) => detail.total,
        }
    }

    /// Attempts left on the active stage, when the server tracks them.
    pub fn fails_left(&self) -> Option<u32> {
        match self {
            Self::Points(_) => None,
            Self::Detailed(detail) => detail.fails_left,
        }
    }
}

/// Puzzle description. Everything beyond the common header is variant specific and only
/// interpreted by the matching [`crate::puzzles::PuzzleVariant`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PuzzlePrompt {
    /// Variant tag used to look up the renderer.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    /// Heading of the puzzle.
    #[serde(default)]
    pub title: Option<String>,
    /// Instruction text, may contain `<br>`.
    #[serde(default)]
    pub instruction: Option<String>,
    /// Variant-specific fields, kept opaque.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PuzzlePrompt {
    /// Build a prompt from its tag and a JSON object of variant fields.
    pub fn new(kind: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            title: None,
            instruction: None,
            fields,
        }
    }

    /// Look up a variant-specific field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// First field present among `keys`, tolerating renames across server revisions.
    pub fn field_any(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.field(key))
    }

    /// Instruction split into display lines. Both `\n` and legacy `<br>` separators break lines.
    pub fn instruction_lines(&self) -> Vec<String> {
        self.instruction
            .as_deref()
            .unwrap_or_default()
            .replace("<br>", "\n")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn hint_counter_clamps_overuse() {
        let hints = HintCounter { total: 3, used: 5 };
        assert_eq!(hints.remaining(), 0);
        assert_eq!(HintCounter { total: 3, used: 1 }.remaining(), 2);
    }

    #[test]
    fn snapshot_tolerates_nulls_and_missing_fields() {
        let snapshot: RoomSnapshot = serde_json::from_value(json!({
            "finished": true,
            "success": true,
            "remaining": null,
            "score": 42,
            "hints": null,
            "prompt": null
        }))
        .unwrap();

        assert!(snapshot.finished);
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.score, Some(ScoreField::Points(42.0)));
        assert_eq!(snapshot.hints, HintCounter::default());
        assert!(snapshot.prompt.is_none());
    }

    #[test]
    fn prompt_keeps_variant_fields_opaque() {
        let snapshot: RoomSnapshot = serde_json::from_value(json!({
            "remaining": 90,
            "prompt": {
                "type": "energy_180",
                "title": "Salle 3",
                "instruction": "Ligne 1\nLigne 2",
                "eolien": 50,
                "min": 0
            },
            "score": {"total": 0, "by_stage": [], "fails_left": 2}
        }))
        .unwrap();

        let prompt = snapshot.prompt.unwrap();
        assert_eq!(prompt.kind, "energy_180");
        assert_eq!(prompt.field("eolien"), Some(&json!(50)));
        assert_eq!(prompt.instruction_lines(), vec!["Ligne 1", "Ligne 2"]);
        assert_eq!(snapshot.score.and_then(|score| score.fails_left()), Some(2));
    }

    #[test]
    fn legacy_br_breaks_lines() {
        let prompt = PuzzlePrompt {
            instruction: Some("Mon premier<br>Mon second".into()),
            ..PuzzlePrompt::default()
        };
        assert_eq!(prompt.instruction_lines(), vec!["Mon premier", "Mon second"]);
    }
}
