//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SeedgridConfig;
use crate::error::EngineError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate from the default file and environment.
    pub fn load() -> Result<SeedgridConfig, EngineError> {
        Self::checked(MergeService::load()?)
    }

    /// Load and validate from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<SeedgridConfig, EngineError> {
        Self::checked(MergeService::load_from_file(path)?)
    }

    fn checked(config: SeedgridConfig) -> Result<SeedgridConfig, EngineError> {
        config.validate()?;
        Ok(config)
    }
}
