use crate::error::EngineError;
use serde::{Deserialize, Serialize};

use super::validation::ValidationResult;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV_VAR: &str = "BRIA_API_KEY";

fn default_endpoint() -> String {
    "https://engine.prod.bria-api.com/v1".to_string()
}

fn default_route() -> String {
    "text-to-image/base/2.3".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// HTTP image provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Label used in logs and recorded generation payloads.
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Base URL of the provider API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Route appended to the endpoint for text-to-image requests.
    #[serde(default = "default_route")]
    pub route: String,

    /// API key optional and can be loaded from environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Transport-level request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "bria".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            endpoint: default_endpoint(),
            route: default_route(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    fn endpoint_has_scheme(endpoint: &str) -> bool {
        endpoint.starts_with("http://") || endpoint.starts_with("https://")
    }

    pub fn endpoint_url_is_valid(endpoint: &str) -> bool {
        let endpoint = endpoint.trim();
        if !Self::endpoint_has_scheme(endpoint) {
            return false;
        }

        let Some(rest) = endpoint.split_once("://").map(|(_, rest)| rest) else {
            return false;
        };

        if rest.is_empty() || rest.chars().any(char::is_whitespace) {
            return false;
        }

        let authority = rest.split('/').next().unwrap_or_default();
        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        let host = if host_port.starts_with('[') {
            let Some(end_bracket) = host_port.find(']') else {
                return false;
            };
            &host_port[1..end_bracket]
        } else {
            host_port.split(':').next().unwrap_or_default()
        };

        if host.is_empty() {
            return false;
        }

        host == "localhost" || host.contains('.') || host.parse::<std::net::IpAddr>().is_ok()
    }

    /// Full URL for generation requests.
    pub fn generation_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim().trim_end_matches('/'),
            self.route.trim().trim_start_matches('/')
        )
    }

    /// API key from config, falling back to the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate provider configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider_name.trim().is_empty() {
            return Err("Provider name cannot be empty".to_string());
        }

        if !Self::endpoint_url_is_valid(&self.endpoint) {
            return Err(format!("Invalid endpoint URL: {}", self.endpoint));
        }

        if self.route.trim().is_empty() {
            return Err("Provider route cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Provider timeout must be positive".to_string());
        }

        Ok(())
    }

    /// Validate and convert the failure into an engine configuration error.
    pub fn ensure_valid(&self) -> Result<(), EngineError> {
        self.validate().map_err(EngineError::ConfigError)
    }

    /// Itemized check report for display.
    pub fn diagnose(&self) -> ValidationResult {
        let mut result = ValidationResult::new(self.provider_name.clone());

        if self.provider_name.trim().is_empty() {
            result.add_error("Provider name cannot be empty".to_string());
        } else {
            result.add_check("Provider name is set", true);
        }

        if Self::endpoint_url_is_valid(&self.endpoint) {
            result.add_check("Endpoint URL is valid", true);
        } else {
            result.add_error(format!("Invalid endpoint URL: {}", self.endpoint));
        }

        if self.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false) {
            result.add_check("API key available (from config)", true);
        } else if self.resolve_api_key().is_some() {
            result.add_check("API key available (from environment)", true);
        } else {
            result.add_warning(format!(
                "API key not found (set {} or add to config)",
                API_KEY_ENV_VAR
            ));
        }

        if self.timeout_secs > 0 {
            result.add_check("Timeout is positive", true);
        } else {
            result.add_error("Provider timeout must be positive".to_string());
        }

        result
    }
}
