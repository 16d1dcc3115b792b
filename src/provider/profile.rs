pub mod config;
pub mod validation;

pub use config::ProviderConfig;
pub use validation::ValidationResult;
