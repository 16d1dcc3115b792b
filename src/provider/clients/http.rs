//! HTTP text-to-image client speaking the Bria-style JSON protocol.

use crate::error::{EngineError, ProviderError};
use crate::provider::profile::config::API_KEY_ENV_VAR;
use crate::provider::profile::ProviderConfig;
use crate::provider::{GenerationProvider, ImageResult};
use crate::types::{AspectRatio, Seed};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    result: Vec<GenerationItem>,
}

#[derive(Debug, Deserialize)]
struct GenerationItem {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

pub struct HttpImageProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    api_key: String,
}

impl HttpImageProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, EngineError> {
        config.ensure_valid()?;
        let api_key = config.resolve_api_key().ok_or_else(|| {
            EngineError::ConfigError(format!(
                "Provider API key required (set in config or {} env var)",
                API_KEY_ENV_VAR
            ))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn error_for_status(status: StatusCode, body: &str) -> ProviderError {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let mut message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| body.trim().to_string());
        if let Some(request_id) = parsed.and_then(|b| b.request_id) {
            message = format!("{} (request_id={})", message, request_id);
        }
        if status == StatusCode::UNAUTHORIZED {
            message = "API key is missing or invalid".to_string();
        }

        let message = format!("HTTP {}: {}", status.as_u16(), message);
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::timeout(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY => ProviderError::invalid_request(message),
            _ => ProviderError::unknown(message),
        }
    }

    /// Status-mapped error when the error body itself could not be read
    fn error_for_unreadable_body(status: StatusCode, reason: &str) -> ProviderError {
        let mut err = Self::error_for_status(status, "");
        err.message = format!("{} (error body unreadable: {})", err.message, reason);
        err
    }

    fn map_transport_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::timeout(format!("Request timed out: {}", err))
        } else {
            ProviderError::unknown(format!("Request failed: {}", err))
        }
    }
}

#[async_trait]
impl GenerationProvider for HttpImageProvider {
    async fn submit(
        &self,
        prompt: &str,
        seed: Seed,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageResult, ProviderError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ProviderError::invalid_request("Prompt cannot be empty"));
        }

        let payload = json!({
            "prompt": prompt,
            "num_results": 1,
            "aspect_ratio": aspect_ratio.as_str(),
            "sync": true,
            "seed": seed,
        });
        let url = self.config.generation_url();
        debug!(url = %url, seed, aspect_ratio = %aspect_ratio, "Submitting generation request");

        let response = self
            .client
            .post(&url)
            .header("api_token", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let err = match response.text().await {
                Ok(body) => Self::error_for_status(status, &body),
                Err(e) => Self::error_for_unreadable_body(status, &e.to_string()),
            };
            error!(status = status.as_u16(), error = %err, "Provider rejected generation request");
            return Err(err);
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unknown(format!("Malformed provider response: {}", e)))?;

        let item = body
            .result
            .into_iter()
            .find(|item| !item.urls.is_empty())
            .ok_or_else(|| ProviderError::unknown("No images returned from API"))?;
        let echoed_seed = item.seed.unwrap_or(seed as u64);
        let url = item
            .urls
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::unknown("No images returned from API"))?;

        Ok(ImageResult::new(url)
            .with_metadata("provider", self.config.provider_name.clone())
            .with_metadata("seed", echoed_seed.to_string()))
    }

    fn name(&self) -> &str {
        &self.config.provider_name
    }
}
