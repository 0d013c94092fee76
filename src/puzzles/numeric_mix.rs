use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::dto::snapshot::PuzzlePrompt;

use super::{
    AnswerPayload, FormControl, FormDescriptor, PuzzleVariant, format_number, number_field,
    number_value, snap, str_field,
};

/// Fixed contributions sent at the top level by older prompt revisions.
const LEGACY_FIXED_KEYS: &[&str] = &["eolien", "solaire", "hydro"];
/// Channel name used when the prompt only describes a single slider.
const LEGACY_CHANNEL: &str = "fossil";
const LEGACY_BOUNDS: (f64, f64, f64) = (0.0, 60.0, 1.0);
const EPSILON: f64 = 1e-9;

/// Balance named channels against a target total.
///
/// Each channel becomes a bounded slider; the running total is a derived display only.
/// Captures `{ "mix": { channel: value } }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericMix;

#[derive(Debug, Clone, PartialEq)]
struct Channel {
    name: String,
    label: String,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
}

impl NumericMix {
    fn channels(prompt: &PuzzlePrompt) -> Vec<Channel> {
        if let Some(channels) = prompt.field("channels").and_then(Value::as_array) {
            return channels
                .iter()
                .filter_map(|channel| {
                    let name = str_field(channel, &["name", "id"])?;
                    Some(Channel::from_bounds(
                        name,
                        str_field(channel, &["label"]).unwrap_or(name),
                        channel,
                    ))
                })
                .collect();
        }

        // Older prompts describe one slider through top-level bounds, or a `fossile` object.
        let bounds = prompt
            .field("fossile")
            .filter(|value| value.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(prompt.fields.clone()));
        vec![Channel::from_bounds(LEGACY_CHANNEL, "Fossil gas", &bounds)]
    }

    fn fixed(prompt: &PuzzlePrompt) -> IndexMap<String, f64> {
        if let Some(fixed) = prompt.field("fixed").and_then(Value::as_object) {
            return fixed
                .iter()
                .filter_map(|(name, value)| Some((name.clone(), value.as_f64()?)))
                .collect();
        }

        LEGACY_FIXED_KEYS
            .iter()
            .filter_map(|key| Some((key.to_string(), prompt.field(key)?.as_f64()?)))
            .collect()
    }
}

impl Channel {
    fn from_bounds(name: &str, label: &str, bounds: &Value) -> Self {
        let (legacy_min, legacy_max, legacy_step) = LEGACY_BOUNDS;
        let min = number_field(bounds, &["min"]).unwrap_or(legacy_min);
        let max = number_field(bounds, &["max"]).unwrap_or(legacy_max);
        let step = number_field(bounds, &["step"]).unwrap_or(legacy_step);
        // Sliders start at their lower bound unless the prompt says otherwise.
        let default = snap(
            number_field(bounds, &["default", "value"]).unwrap_or(min),
            min,
            max,
            step,
        );
        Self {
            name: name.to_string(),
            label: label.to_string(),
            min,
            max,
            step,
            default,
        }
    }
}

impl PuzzleVariant for NumericMix {
    fn name(&self) -> &'static str {
        "numeric_mix"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["energy_180", "energy180", "energy_mw", "numeric_mix"]
    }

    fn render(&self, prompt: &PuzzlePrompt) -> FormDescriptor {
        let mut form = FormDescriptor::default();
        for channel in Self::channels(prompt) {
            form.push(FormControl::Range {
                key: channel.name,
                label: channel.label,
                min: channel.min,
                max: channel.max,
                step: channel.step,
                value: channel.default,
            });
        }

        let fixed = Self::fixed(prompt);
        if !fixed.is_empty() {
            let parts = fixed
                .iter()
                .map(|(name, value)| format!("{name}: {}", format_number(*value)))
                .collect::<Vec<_>>()
                .join(" · ");
            form.notes.push(format!("Fixed: {parts}"));
        }
        if let Some(target) = prompt.field("target").and_then(Value::as_f64) {
            form.notes.push(format!("Target: {}", format_number(target)));
        }

        form
    }

    fn capture(&self, form: &FormDescriptor) -> AnswerPayload {
        let mix = form
            .controls
            .values()
            .filter_map(|control| match control {
                FormControl::Range { key, value, .. } => Some((key.clone(), number_value(*value))),
                _ => None,
            })
            .collect::<Map<_, _>>();

        let mut payload = AnswerPayload::new();
        payload.insert("mix".into(), Value::Object(mix));
        payload
    }

    fn derived(&self, prompt: &PuzzlePrompt, form: &FormDescriptor) -> Vec<String> {
        let channels = form
            .controls
            .values()
            .filter_map(|control| match control {
                FormControl::Range { label, value, .. } => Some((label.as_str(), *value)),
                _ => None,
            })
            .collect::<Vec<_>>();

        let total = Self::fixed(prompt).values().sum::<f64>()
            + channels.iter().map(|(_, value)| value).sum::<f64>();

        let mut lines = channels
            .iter()
            .map(|(label, value)| format!("{label}: {}", format_number(*value)))
            .collect::<Vec<_>>();
        lines.push(format!("Total: {}", format_number(total)));

        if let Some(target) = prompt.field("target").and_then(Value::as_f64) {
            if (total - target).abs() < EPSILON {
                lines.push("Target reached, you can submit".to_string());
            }
        }
        lines
    }
}
