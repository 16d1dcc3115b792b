//! MergeService: layers sources and deserializes to SeedgridConfig.

use crate::config::paths;
use crate::config::sources::{environment, file};
use crate::config::SeedgridConfig;
use config::{Config, ConfigError};
use std::path::Path;
use tracing::debug;

pub struct MergeService;

impl MergeService {
    /// Default config file if present, then environment.
    pub fn load() -> Result<SeedgridConfig, ConfigError> {
        let builder = Config::builder();
        let builder = match paths::default_config_file() {
            Ok(path) => {
                debug!(path = %path.display(), "Layering default config file");
                file::add_to_builder(builder, &path, false)
            }
            Err(_) => builder,
        };
        Self::finish(environment::add_to_builder(builder))
    }

    /// A specific file, which must exist, then environment.
    pub fn load_from_file(path: &Path) -> Result<SeedgridConfig, ConfigError> {
        let builder = file::add_to_builder(Config::builder(), path, true);
        Self::finish(environment::add_to_builder(builder))
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<SeedgridConfig, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
