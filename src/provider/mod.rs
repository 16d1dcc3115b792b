//! Generation Provider
//!
//! Capability boundary between the matrix engine and whatever produces images.
//! The engine only ever sees `GenerationProvider`; vendors, test doubles, and
//! recording wrappers all plug in behind it.

pub mod clients;
pub mod profile;

use crate::error::ProviderError;
use crate::types::{AspectRatio, Seed};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use clients::HttpImageProvider;
pub use profile::{ProviderConfig, ValidationResult};

/// Successful provider output for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub image_url: String,
    /// Provider-specific details (request id, echoed seed, ...)
    #[serde(default)]
    pub provider_metadata: HashMap<String, String>,
}

impl ImageResult {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            provider_metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.provider_metadata.insert(key.into(), value.into());
        self
    }
}

/// Image generation capability
///
/// Implementations must be safe to call concurrently; the engine issues up to
/// nine overlapping submissions per matrix. Retry policy, if any, lives here
/// and not in the engine.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn submit(
        &self,
        prompt: &str,
        seed: Seed,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageResult, ProviderError>;

    /// Short label used in logs and recorded payloads
    fn name(&self) -> &str {
        "unknown"
    }
}
