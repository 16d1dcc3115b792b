//! Error types for the matrix engine, its collaborators, and lineage queries.

use crate::types::{AssetId, GridPosition, Seed};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a generation provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    RateLimited,
    InvalidRequest,
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::InvalidRequest => "invalid request",
            ProviderErrorKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Failure reported by a generation provider for a single submission
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("provider error ({kind}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unknown, message)
    }
}

/// Asset store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Asset not found: {0}")]
    NotFound(AssetId),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Engine-level errors surfaced to callers
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request, rejected before any dispatch
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Asset not found: {0}")]
    NotFound(AssetId),

    /// Single-dispatch provider failure (mutation, single cell)
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every cell of a matrix failed
    #[error("All 9 cells failed for seed {seed}: {}", summarize_failures(.failures))]
    AllCellsFailed {
        seed: Seed,
        failures: Vec<(GridPosition, String)>,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Cycle or excessive depth while walking parent links
    #[error("Corrupt lineage at asset {asset_id}: {reason}")]
    CorruptLineage { asset_id: AssetId, reason: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn summarize_failures(failures: &[(GridPosition, String)]) -> String {
    failures
        .iter()
        .map(|(position, reason)| format!("{} {}", position, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Persistence(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}
