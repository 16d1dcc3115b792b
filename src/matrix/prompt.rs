//! Cell prompt construction and axis validation.

use crate::error::EngineError;
use crate::types::GRID_SIZE;

/// Appended to every cell prompt
pub const PROMPT_SUFFIX: &str = "professional photography";

/// Maximum base prompt length in characters
pub const MAX_BASE_PROMPT_CHARS: usize = 1000;

pub const DEFAULT_CAMERA_ANGLES: [&str; GRID_SIZE] = ["front view", "side view", "top-down view"];

pub const DEFAULT_LIGHTING_STYLES: [&str; GRID_SIZE] =
    ["studio lighting", "neon lighting", "natural sunlight"];

/// Build the prompt for one cell.
///
/// Pure function of its inputs: base, angle, lighting and suffix joined in that order.
pub fn build_cell_prompt(base_prompt: &str, angle: &str, lighting: &str) -> String {
    format!("{}, {}, {}, {}", base_prompt, angle, lighting, PROMPT_SUFFIX)
}

pub fn default_camera_angles() -> Vec<String> {
    DEFAULT_CAMERA_ANGLES.iter().map(|s| s.to_string()).collect()
}

pub fn default_lighting_styles() -> Vec<String> {
    DEFAULT_LIGHTING_STYLES.iter().map(|s| s.to_string()).collect()
}

/// Validate and trim the base prompt.
pub fn validate_base_prompt(base_prompt: &str) -> Result<String, EngineError> {
    let trimmed = base_prompt.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(
            "Base prompt cannot be empty".to_string(),
        ));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_BASE_PROMPT_CHARS {
        return Err(EngineError::Validation(format!(
            "Base prompt is {} characters (max {})",
            chars, MAX_BASE_PROMPT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate one axis: exactly three non-empty values, returned trimmed.
pub fn validate_axis(name: &str, values: &[String]) -> Result<[String; GRID_SIZE], EngineError> {
    if values.len() != GRID_SIZE {
        return Err(EngineError::Validation(format!(
            "{} must contain exactly {} values, got {}",
            name,
            GRID_SIZE,
            values.len()
        )));
    }
    let mut axis: [String; GRID_SIZE] = Default::default();
    for (slot, value) in axis.iter_mut().zip(values) {
        let value = value.trim();
        if value.is_empty() {
            return Err(EngineError::Validation(format!(
                "{} cannot contain empty values",
                name
            )));
        }
        *slot = value.to_string();
    }
    Ok(axis)
}
