use serde_json::Value;
use tracing::debug;

use crate::dto::snapshot::PuzzlePrompt;

use super::{AnswerPayload, ChoiceOption, FormControl, FormDescriptor, PuzzleVariant, str_field};

const LABEL_KEYS: &[&str] = &["label", "name"];
const ICON_KEYS: &[&str] = &["icon", "emoji"];

/// Sort items into bins: one choice per item, options taken from the bin list.
///
/// Captures `{ "assign": { itemId: binId } }`; items left unassigned are sent as `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classification;

impl PuzzleVariant for Classification {
    fn name(&self) -> &'static str {
        "classification"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["waste_v2", "waste", "classification"]
    }

    fn render(&self, prompt: &PuzzlePrompt) -> FormDescriptor {
        let bins = entries(prompt, &["bins"]);
        let options = bins
            .iter()
            .filter_map(|bin| {
                let id = str_field(bin, &["id"])?;
                Some(ChoiceOption {
                    id: id.to_string(),
                    label: str_field(bin, LABEL_KEYS).unwrap_or(id).to_string(),
                })
            })
            .collect::<Vec<_>>();

        let mut form = FormDescriptor::default();
        for item in entries(prompt, &["items", "objects"]) {
            let Some(id) = str_field(item, &["id"]) else {
                debug!(item = %item, "skipping classification item without id");
                continue;
            };
            form.push(FormControl::Choice {
                key: id.to_string(),
                label: str_field(item, LABEL_KEYS).unwrap_or(id).to_string(),
                icon: str_field(item, ICON_KEYS).map(str::to_string),
                options: options.clone(),
                selected: None,
            });
        }

        if !bins.is_empty() {
            let legend = bins
                .iter()
                .filter_map(|bin| {
                    let label = str_field(bin, LABEL_KEYS).or_else(|| str_field(bin, &["id"]))?;
                    Some(match str_field(bin, ICON_KEYS) {
                        Some(icon) if !icon.is_empty() => format!("{icon} {label}"),
                        _ => label.to_string(),
                    })
                })
                .collect::<Vec<_>>()
                .join(" · ");
            form.notes.push(format!("Bins: {legend}"));
        }

        form
    }

    fn capture(&self, form: &FormDescriptor) -> AnswerPayload {
        let assign = form
            .controls
            .values()
            .filter_map(|control| match control {
                FormControl::Choice { key, selected, .. } => Some((
                    key.clone(),
                    Value::from(selected.clone().unwrap_or_default()),
                )),
                _ => None,
            })
            .collect::<serde_json::Map<_, _>>();

        let mut payload = AnswerPayload::new();
        payload.insert("assign".into(), Value::Object(assign));
        payload
    }
}

/// Array field of the prompt, trying each key in order.
fn entries<'a>(prompt: &'a PuzzlePrompt, keys: &[&str]) -> Vec<&'a Value> {
    prompt
        .field_any(keys)
        .and_then(Value::as_array)
        .map(|array| array.iter().collect())
        .unwrap_or_default()
}
