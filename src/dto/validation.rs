//! Validation helpers for DTOs.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::events::AuthRequest;

/// Display name used when the player leaves the name field blank.
pub const DEFAULT_PLAYER_NAME: &str = "Agent";

/// Canonical form of a player code: surrounding whitespace removed, upper-cased.
pub fn normalize_player_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Trimmed display name, or [`DEFAULT_PLAYER_NAME`] when blank.
pub fn normalize_display_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Validates that a normalized player code is present.
///
/// # Examples
///
/// ```ignore
/// validate_player_code("4F2A9C") // Ok
/// validate_player_code("")       // Err - empty
/// ```
pub fn validate_player_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        let mut err = ValidationError::new("player_code_empty");
        err.message = Some("Enter your player code.".into());
        return Err(err);
    }

    Ok(())
}

impl Validate for AuthRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_player_code(&self.player_code) {
            errors.add("player_code", e);
        }

        if self.room.trim().is_empty() {
            let mut err = ValidationError::new("room_empty");
            err.message = Some("No room selected.".into());
            errors.add("room", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
