//! Platform directories for config, data and logs.

use crate::error::EngineError;
use directories::ProjectDirs;
use std::path::PathBuf;

pub fn project_dirs() -> Result<ProjectDirs, EngineError> {
    ProjectDirs::from("", "", "seedgrid").ok_or_else(|| {
        EngineError::ConfigError(
            "Could not determine platform directories (HOME not set)".to_string(),
        )
    })
}

/// `<config dir>/config.toml`
pub fn default_config_file() -> Result<PathBuf, EngineError> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// `<data dir>/assets`
pub fn default_store_path() -> Result<PathBuf, EngineError> {
    Ok(project_dirs()?.data_dir().join("assets"))
}
