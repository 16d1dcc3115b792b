//! Environment variable source: SEEDGRID prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "SEEDGRID";

/// `SEEDGRID__ENGINE__DISPATCH_TIMEOUT_MS=5000` sets `engine.dispatch_timeout_ms`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
