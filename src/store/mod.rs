//! Asset Store
//!
//! Generation records addressed by id. Assets are immutable once created apart
//! from file-metadata backfill; parent links are plain ids so the lineage graph
//! is an arena rather than an object graph.

pub mod memory;
pub mod persistence;

use crate::error::{EngineError, StoreError};
use crate::types::{AspectRatio, AssetId, GridPosition, ProjectId, Seed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use memory::InMemoryAssetStore;
pub use persistence::SledAssetStore;

/// How an asset came to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Matrix,
    SingleCell,
    Mutation,
    Spawn,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 4] = [
        GenerationMode::Matrix,
        GenerationMode::SingleCell,
        GenerationMode::Mutation,
        GenerationMode::Spawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Matrix => "matrix",
            GenerationMode::SingleCell => "single_cell",
            GenerationMode::Mutation => "mutation",
            GenerationMode::Spawn => "spawn",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GenerationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown generation mode '{}' (expected matrix, single_cell, mutation or spawn)",
                    s
                )
            })
    }
}

/// Generation parameters as recorded in an asset's json payload
///
/// Only the prompt axes are required. Payloads from other writers may omit the
/// rest, and `seed`/`aspect_ratio` are overwritten from the asset on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub base_prompt: String,
    pub angle: String,
    pub lighting: String,
    #[serde(default)]
    pub seed: Seed,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Axis overrides applied by a mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutations: Option<BTreeMap<String, String>>,
}

/// File details filled in after download by the storage collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Immutable generation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub project_id: ProjectId,
    /// Weak reference used only for lineage lookup
    pub parent_id: Option<AssetId>,
    pub prompt: String,
    pub seed: Seed,
    pub aspect_ratio: AspectRatio,
    pub image_url: Option<String>,
    pub matrix_position: Option<GridPosition>,
    pub json_payload: serde_json::Value,
    #[serde(default)]
    pub file: FileMetadata,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Build the stored form of a draft with a fresh id.
    pub fn from_draft(draft: AssetDraft) -> Self {
        Self {
            id: AssetId::new_v4(),
            project_id: draft.project_id,
            parent_id: draft.parent_id,
            prompt: draft.prompt,
            seed: draft.seed,
            aspect_ratio: draft.aspect_ratio,
            image_url: draft.image_url,
            matrix_position: draft.matrix_position,
            json_payload: draft.json_payload,
            file: FileMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Decode the recorded generation parameters.
    ///
    /// The axes come from the payload; seed and aspect ratio come from the
    /// asset's own fields.
    pub fn generation_record(&self) -> Result<GenerationRecord, EngineError> {
        let mut record: GenerationRecord = serde_json::from_value(self.json_payload.clone())
            .map_err(|e| {
                EngineError::Validation(format!(
                    "Asset {} has no usable generation payload: {}",
                    self.id, e
                ))
            })?;
        record.seed = self.seed;
        record.aspect_ratio = self.aspect_ratio;
        Ok(record)
    }

    /// Provider label recorded in the payload, if any
    pub fn provider(&self) -> Option<&str> {
        self.json_payload.get("provider").and_then(|v| v.as_str())
    }

    /// Generation mode recorded in the payload, if any
    pub fn mode(&self) -> Option<GenerationMode> {
        self.json_payload
            .get("mode")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// Apply backfilled file fields, leaving identity, seed and lineage untouched.
    pub fn merge_file_metadata(&mut self, update: FileMetadata) {
        let file = &mut self.file;
        if update.image_path.is_some() {
            file.image_path = update.image_path;
        }
        if update.file_id.is_some() {
            file.file_id = update.file_id;
        }
        if update.file_size.is_some() {
            file.file_size = update.file_size;
        }
        if update.content_type.is_some() {
            file.content_type = update.content_type;
        }
        if update.checksum.is_some() {
            file.checksum = update.checksum;
        }
    }
}

/// Everything needed to create an asset; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDraft {
    pub project_id: ProjectId,
    pub parent_id: Option<AssetId>,
    pub prompt: String,
    pub seed: Seed,
    pub aspect_ratio: AspectRatio,
    pub image_url: Option<String>,
    pub matrix_position: Option<GridPosition>,
    pub json_payload: serde_json::Value,
}

impl AssetDraft {
    pub fn new(
        project_id: impl Into<ProjectId>,
        prompt: impl Into<String>,
        record: &GenerationRecord,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            project_id: project_id.into(),
            parent_id: None,
            prompt: prompt.into(),
            seed: record.seed,
            aspect_ratio: record.aspect_ratio,
            image_url: None,
            matrix_position: None,
            json_payload: serde_json::to_value(record)?,
        })
    }

    pub fn with_parent(mut self, parent_id: Option<AssetId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_position(mut self, position: Option<GridPosition>) -> Self {
        self.matrix_position = position;
        self
    }
}

/// Asset persistence capability
///
/// `create` must be a self-contained insert: concurrent cells write
/// independently and in arbitrary order.
pub trait AssetStore: Send + Sync {
    fn create(&self, draft: AssetDraft) -> Result<Asset, StoreError>;
    fn get(&self, id: &AssetId) -> Result<Option<Asset>, StoreError>;
    /// Children in insertion order where the backend tracks it
    fn list_children(&self, parent_id: &AssetId) -> Result<Vec<Asset>, StoreError>;
    fn list_by_seed(&self, seed: Seed) -> Result<Vec<Asset>, StoreError>;
    fn record_file_metadata(&self, id: &AssetId, file: FileMetadata)
        -> Result<Asset, StoreError>;

    /// Every asset, oldest first
    fn list_all(&self) -> Result<Vec<Asset>, StoreError>;

    /// Matrix cells of one project and seed, ordered by grid position
    fn list_matrix(&self, project_id: &str, seed: Seed) -> Result<Vec<Asset>, StoreError> {
        let mut assets: Vec<Asset> = self
            .list_by_seed(seed)?
            .into_iter()
            .filter(|a| a.project_id == project_id && a.matrix_position.is_some())
            .collect();
        assets.sort_by_key(|a| a.matrix_position);
        Ok(assets)
    }

    fn list_by_project(&self, project_id: &str) -> Result<Vec<Asset>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|a| a.project_id == project_id)
            .collect())
    }

    fn list_by_provider(&self, provider: &str) -> Result<Vec<Asset>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|a| a.provider() == Some(provider))
            .collect())
    }

    fn list_by_mode(&self, mode: GenerationMode) -> Result<Vec<Asset>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|a| a.mode() == Some(mode))
            .collect())
    }

    /// Asset whose backfilled file metadata carries `file_id`
    fn find_by_file_id(&self, file_id: &str) -> Result<Option<Asset>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|a| a.file.file_id.as_deref() == Some(file_id)))
    }
}
