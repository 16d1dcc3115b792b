//! Axis mutations applied to a recorded cell.

use crate::error::EngineError;
use crate::store::GenerationRecord;
use std::collections::BTreeMap;

pub const ANGLE_KEY: &str = "angle";
pub const LIGHTING_KEY: &str = "lighting";

/// Validated mutation: which axis values to replace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisMutation {
    pub angle: Option<String>,
    pub lighting: Option<String>,
}

impl AxisMutation {
    /// Parse a key/value map. Only `angle` and `lighting` are recognized.
    pub fn parse<'a, I>(entries: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut mutation = AxisMutation::default();
        for (key, value) in entries {
            let value = value.trim();
            if value.is_empty() {
                return Err(EngineError::Validation(format!(
                    "Mutation value for '{}' cannot be empty",
                    key
                )));
            }
            match key.as_str() {
                ANGLE_KEY => mutation.angle = Some(value.to_string()),
                LIGHTING_KEY => mutation.lighting = Some(value.to_string()),
                other => {
                    return Err(EngineError::Validation(format!(
                        "Unrecognized mutation key '{}' (expected {} or {})",
                        other, ANGLE_KEY, LIGHTING_KEY
                    )))
                }
            }
        }
        if mutation.is_empty() {
            return Err(EngineError::Validation(
                "At least one of angle or lighting must be mutated".to_string(),
            ));
        }
        Ok(mutation)
    }

    pub fn is_empty(&self) -> bool {
        self.angle.is_none() && self.lighting.is_none()
    }

    /// Substitute the mutated axes into a copy of `source`.
    ///
    /// Seed, aspect ratio, base prompt and any axis not named stay as recorded.
    pub fn apply(&self, source: &GenerationRecord) -> GenerationRecord {
        let mut record = source.clone();
        if let Some(angle) = &self.angle {
            record.angle = angle.clone();
        }
        if let Some(lighting) = &self.lighting {
            record.lighting = lighting.clone();
        }
        record.mutations = Some(self.to_map());
        record
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(angle) = &self.angle {
            map.insert(ANGLE_KEY.to_string(), angle.clone());
        }
        if let Some(lighting) = &self.lighting {
            map.insert(LIGHTING_KEY.to_string(), lighting.clone());
        }
        map
    }
}
