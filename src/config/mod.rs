//! Configuration
//!
//! Layered settings: built-in defaults, then an optional TOML file, then
//! `SEEDGRID__SECTION__KEY` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use crate::matrix::EngineConfig;
use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use facade::ConfigLoader;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedgridConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
}

impl SeedgridConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let sections = [
            self.engine.validate(),
            self.store.validate(),
            self.provider.validate(),
            self.logging.validate(),
        ];
        let errors: Vec<String> = sections.into_iter().filter_map(Result::err).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ConfigError(errors.join("; ")))
        }
    }
}

/// Asset store location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Sled directory; None resolves to the platform data directory
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        match &self.path {
            Some(path) if path.as_os_str().is_empty() => {
                Err("store.path cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn resolve_path(&self) -> Result<PathBuf, EngineError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => paths::default_store_path(),
        }
    }
}
