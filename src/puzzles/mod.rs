//! Puzzle variant registry: maps a prompt `type` tag to a renderer and an answer capture.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{dto::snapshot::PuzzlePrompt, error::ServiceError};

mod classification;
mod numeric_mix;
mod text;

pub use self::classification::Classification;
pub use self::numeric_mix::NumericMix;
pub use self::text::FreeText;

/// Canonical answer object sent as the `payload` of a submission.
pub type AnswerPayload = Map<String, Value>;

/// One option of a choice control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    /// Value sent when selected.
    pub id: String,
    /// Text shown to the player.
    pub label: String,
}

/// An interactive control of the rendered form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormControl {
    /// Pick one option (or none) from a fixed list.
    Choice {
        key: String,
        label: String,
        icon: Option<String>,
        options: Vec<ChoiceOption>,
        selected: Option<String>,
    },
    /// Free text field.
    Text {
        key: String,
        placeholder: String,
        value: String,
    },
    /// Bounded numeric slider.
    Range {
        key: String,
        label: String,
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    },
}

impl FormControl {
    /// Key the control is addressed by.
    pub fn key(&self) -> &str {
        match self {
            Self::Choice { key, .. } | Self::Text { key, .. } | Self::Range { key, .. } => key,
        }
    }

    /// Update the control from raw player input.
    ///
    /// Choices accept an option id (or an empty string to clear), ranges clamp to their bounds
    /// and snap to their step.
    pub fn set(&mut self, raw: &str) -> Result<(), ServiceError> {
        match self {
            Self::Choice {
                key,
                options,
                selected,
                ..
            } => {
                let raw = raw.trim();
                if raw.is_empty() {
                    *selected = None;
                    return Ok(());
                }
                let option = options
                    .iter()
                    .find(|option| option.id == raw || option.label.eq_ignore_ascii_case(raw))
                    .ok_or_else(|| ServiceError::InvalidValue {
                        key: key.clone(),
                        reason: format!("`{raw}` is not one of the offered options"),
                    })?;
                *selected = Some(option.id.clone());
            }
            Self::Text { value, .. } => {
                *value = raw.to_string();
            }
            Self::Range {
                key,
                min,
                max,
                step,
                value,
                ..
            } => {
                let parsed = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .ok_or_else(|| ServiceError::InvalidValue {
                        key: key.clone(),
                        reason: format!("`{}` is not a number", raw.trim()),
                    })?;
                *value = snap(parsed, *min, *max, *step);
            }
        }
        Ok(())
    }
}

/// Full replacement description of the form region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormDescriptor {
    /// Controls keyed by [`FormControl::key`], in display order.
    pub controls: IndexMap<String, FormControl>,
    /// Static helper lines shown under the controls.
    pub notes: Vec<String>,
}

impl FormDescriptor {
    /// Add a control, keyed by its own key.
    pub fn push(&mut self, control: FormControl) {
        self.controls.insert(control.key().to_string(), control);
    }

    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty() && self.notes.is_empty()
    }
}

/// Rendering and capture contract of one puzzle variant.
pub trait PuzzleVariant: fmt::Debug + Send + Sync {
    /// Human readable variant name, used in logs.
    fn name(&self) -> &'static str;

    /// Every `type` tag this variant answers to.
    fn tags(&self) -> &'static [&'static str];

    /// Build the form for `prompt`. Must not depend on anything but the prompt.
    fn render(&self, prompt: &PuzzlePrompt) -> FormDescriptor;

    /// Read the answer out of the current control values.
    fn capture(&self, form: &FormDescriptor) -> AnswerPayload;

    /// Player aid recomputed after every control change; never part of the payload.
    fn derived(&self, _prompt: &PuzzlePrompt, _form: &FormDescriptor) -> Vec<String> {
        Vec::new()
    }
}

/// The form currently on screen together with the variant that rendered it.
#[derive(Debug, Clone, Default)]
pub struct ActiveForm {
    variant: Option<Arc<dyn PuzzleVariant>>,
    prompt: Option<PuzzlePrompt>,
    descriptor: FormDescriptor,
    derived: Vec<String>,
}

impl ActiveForm {
    /// Form with no controls; captures `{}`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Name of the variant that rendered this form, if any.
    pub fn variant_name(&self) -> Option<&'static str> {
        self.variant.as_ref().map(|variant| variant.name())
    }

    /// Rendered controls and notes.
    pub fn descriptor(&self) -> &FormDescriptor {
        &self.descriptor
    }

    /// Current derived display lines.
    pub fn derived(&self) -> &[String] {
        &self.derived
    }

    /// Change one control and recompute the derived display.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), ServiceError> {
        let control = self
            .descriptor
            .controls
            .get_mut(key)
            .ok_or_else(|| ServiceError::UnknownControl(key.to_string()))?;
        control.set(raw)?;
        self.refresh_derived();
        Ok(())
    }

    /// Answer payload built from the current control values.
    pub fn capture(&self) -> AnswerPayload {
        self.variant
            .as_ref()
            .map(|variant| variant.capture(&self.descriptor))
            .unwrap_or_default()
    }

    fn refresh_derived(&mut self) {
        self.derived = match (&self.variant, &self.prompt) {
            (Some(variant), Some(prompt)) => variant.derived(prompt, &self.descriptor),
            _ => Vec::new(),
        };
    }
}

/// Open registry of puzzle variants keyed by tag.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    by_tag: HashMap<String, Arc<dyn PuzzleVariant>>,
}

impl VariantRegistry {
    /// Registry without any variant; every prompt renders empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in classification, riddle, numeric-mix and date variants.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Classification));
        registry.register(Arc::new(FreeText::riddle()));
        registry.register(Arc::new(NumericMix));
        registry.register(Arc::new(FreeText::date()));
        registry
    }

    /// Register `variant` under all of its tags, replacing earlier registrations.
    pub fn register(&mut self, variant: Arc<dyn PuzzleVariant>) {
        for tag in variant.tags() {
            self.register_as(*tag, variant.clone());
        }
    }

    /// Register `variant` under an extra tag.
    pub fn register_as(&mut self, tag: impl Into<String>, variant: Arc<dyn PuzzleVariant>) {
        self.by_tag.insert(tag.into(), variant);
    }

    /// Variant registered for `tag`.
    pub fn lookup(&self, tag: &str) -> Option<Arc<dyn PuzzleVariant>> {
        self.by_tag.get(tag).cloned()
    }

    /// Render `prompt` into a fresh form. Unknown tags render an empty form.
    pub fn render(&self, prompt: &PuzzlePrompt) -> ActiveForm {
        let Some(variant) = self.lookup(&prompt.kind) else {
            warn!(tag = %prompt.kind, "unrecognized puzzle variant; rendering an empty form");
            return ActiveForm::empty();
        };

        debug!(tag = %prompt.kind, variant = variant.name(), "rendering puzzle form");
        let mut form = ActiveForm {
            descriptor: variant.render(prompt),
            variant: Some(variant),
            prompt: Some(prompt.clone()),
            derived: Vec::new(),
        };
        form.refresh_derived();
        form
    }
}

/// Read a string out of `object`, trying each key in order.
fn str_field<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(key).and_then(Value::as_str))
}

/// Read a number out of `object`, trying each key in order.
fn number_field(object: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| object.get(key).and_then(Value::as_f64))
}

/// JSON number, written as an integer when it has no fractional part.
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// Format a number the way [`number_value`] serialises it.
pub(crate) fn format_number(value: f64) -> String {
    number_value(value).to_string()
}

/// Clamp to `[min, max]` and snap to the nearest step from `min`.
fn snap(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let clamped = value.clamp(low, high);
    if step > 0.0 {
        let snapped = low + ((clamped - low) / step).round() * step;
        snapped.clamp(low, high)
    } else {
        clamped
    }
}
