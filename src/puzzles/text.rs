use serde_json::Value;

use crate::dto::snapshot::PuzzlePrompt;

use super::{AnswerPayload, FormControl, FormDescriptor, PuzzleVariant};

/// Single text field captured as `{ <field>: trimmedText }`.
#[derive(Debug, Clone, Copy)]
pub struct FreeText {
    name: &'static str,
    tags: &'static [&'static str],
    field: &'static str,
    placeholder: &'static str,
    note: &'static str,
}

impl FreeText {
    /// Riddle answer, captured as `{ "answer": .. }`.
    pub const fn riddle() -> Self {
        Self {
            name: "riddle",
            tags: &["riddle_v2", "riddle"],
            field: "answer",
            placeholder: "Your answer…",
            note: "Discuss with your team before answering.",
        }
    }

    /// Computed date, captured as `{ "date": .. }`.
    pub const fn date() -> Self {
        Self {
            name: "date",
            tags: &["gaia_v2", "gaia", "date"],
            field: "date",
            placeholder: "Your answer (e.g. 14 March 2025)",
            note: "Add, divide, then convert to a calendar date.",
        }
    }
}

impl PuzzleVariant for FreeText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    fn render(&self, prompt: &PuzzlePrompt) -> FormDescriptor {
        let placeholder = prompt
            .field("placeholder")
            .and_then(Value::as_str)
            .unwrap_or(self.placeholder);

        let mut form = FormDescriptor::default();
        form.push(FormControl::Text {
            key: self.field.to_string(),
            placeholder: placeholder.to_string(),
            value: String::new(),
        });
        form.notes.push(self.note.to_string());
        form
    }

    fn capture(&self, form: &FormDescriptor) -> AnswerPayload {
        let text = match form.controls.get(self.field) {
            Some(FormControl::Text { value, .. }) => value.trim(),
            _ => "",
        };

        let mut payload = AnswerPayload::new();
        payload.insert(self.field.to_string(), Value::from(text));
        payload
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::puzzles::VariantRegistry;

    #[test]
    fn riddle_captures_trimmed_answer() {
        let registry = VariantRegistry::with_builtin();
        let mut form = registry.render(&PuzzlePrompt::new("riddle_v2", json!({})));
        assert_eq!(Value::Object(form.capture()), json!({"answer": ""}));

        form.set_value("answer", "  abeille \n").unwrap();
        assert_eq!(Value::Object(form.capture()), json!({"answer": "abeille"}));
    }

    #[test]
    fn date_captures_under_date_key() {
        let registry = VariantRegistry::with_builtin();
        let mut form = registry.render(&PuzzlePrompt::new("gaia_v2", json!({})));
        form.set_value("date", " 14 mars 2025").unwrap();
        assert_eq!(Value::Object(form.capture()), json!({"date": "14 mars 2025"}));
        assert!(form.descriptor().controls.get("answer").is_none());
    }
}
