//! Matrix requests, cells, and aggregated results.
//!
//! A matrix is nine cells sharing one seed and base prompt. Rows follow the
//! camera-angle axis and columns the lighting axis; every cell is bound to its
//! position when the plan is built and results are written back by position.

pub mod cancel;
pub mod engine;
pub mod mutation;
pub mod prompt;

use crate::error::{EngineError, ProviderError};
use crate::types::{AspectRatio, AssetId, GridPosition, ProjectId, Seed, CELL_COUNT, GRID_SIZE, MAX_SEED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use engine::{EngineConfig, MatrixEngine};
pub use mutation::AxisMutation;

/// Caller input for a new matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRequest {
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub base_prompt: String,
    /// Drawn uniformly from 0..=MAX_SEED when absent
    #[serde(default)]
    pub seed: Option<Seed>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "prompt::default_camera_angles")]
    pub camera_angles: Vec<String>,
    #[serde(default = "prompt::default_lighting_styles")]
    pub lighting_styles: Vec<String>,
}

fn default_aspect_ratio() -> String {
    AspectRatio::default().as_str().to_string()
}

impl MatrixRequest {
    /// Request with default axes, a random seed and a square aspect ratio
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            project_id: None,
            base_prompt: base_prompt.into(),
            seed: None,
            aspect_ratio: default_aspect_ratio(),
            camera_angles: prompt::default_camera_angles(),
            lighting_styles: prompt::default_lighting_styles(),
        }
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_axes(mut self, camera_angles: Vec<String>, lighting_styles: Vec<String>) -> Self {
        self.camera_angles = camera_angles;
        self.lighting_styles = lighting_styles;
        self
    }

    pub fn with_project(mut self, project_id: impl Into<ProjectId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Check every constraint without dispatching anything.
    pub fn validate(&self) -> Result<ValidatedAxes, EngineError> {
        let base_prompt = prompt::validate_base_prompt(&self.base_prompt)?;
        let aspect_ratio: AspectRatio = self
            .aspect_ratio
            .parse()
            .map_err(EngineError::Validation)?;
        if let Some(seed) = self.seed {
            validate_seed(seed)?;
        }
        Ok(ValidatedAxes {
            base_prompt,
            aspect_ratio,
            camera_angles: prompt::validate_axis("camera_angles", &self.camera_angles)?,
            lighting_styles: prompt::validate_axis("lighting_styles", &self.lighting_styles)?,
        })
    }
}

pub fn validate_seed(seed: Seed) -> Result<(), EngineError> {
    if seed > MAX_SEED {
        return Err(EngineError::Validation(format!(
            "Seed {} outside valid range 0..={}",
            seed, MAX_SEED
        )));
    }
    Ok(())
}

/// Request fields after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAxes {
    pub base_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub camera_angles: [String; GRID_SIZE],
    pub lighting_styles: [String; GRID_SIZE],
}

impl ValidatedAxes {
    /// Nine pending cells in row-major order
    pub fn plan_cells(&self) -> Vec<MatrixCell> {
        GridPosition::all()
            .map(|position| self.plan_cell(position))
            .collect()
    }

    pub fn plan_cell(&self, position: GridPosition) -> MatrixCell {
        let angle = &self.camera_angles[position.row()];
        let lighting = &self.lighting_styles[position.col()];
        MatrixCell {
            position,
            angle: angle.clone(),
            lighting: lighting.clone(),
            prompt: prompt::build_cell_prompt(&self.base_prompt, angle, lighting),
            outcome: CellOutcome::Pending,
        }
    }
}

/// Start a new matrix from an existing asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub source_asset_id: AssetId,
    pub base_prompt: String,
    /// Defaults to the source asset's seed
    #[serde(default)]
    pub seed: Option<Seed>,
    /// Defaults to the source asset's aspect ratio
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub camera_angles: Option<Vec<String>>,
    #[serde(default)]
    pub lighting_styles: Option<Vec<String>>,
}

impl SpawnRequest {
    pub fn new(source_asset_id: AssetId, base_prompt: impl Into<String>) -> Self {
        Self {
            source_asset_id,
            base_prompt: base_prompt.into(),
            seed: None,
            aspect_ratio: None,
            camera_angles: None,
            lighting_styles: None,
        }
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_axes(mut self, camera_angles: Vec<String>, lighting_styles: Vec<String>) -> Self {
        self.camera_angles = Some(camera_angles);
        self.lighting_styles = Some(lighting_styles);
        self
    }
}

/// Why a cell failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CellError {
    Provider(ProviderError),
    /// Request cancelled before the cell resolved
    Cancelled,
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellError::Provider(err) => write!(f, "{}", err),
            CellError::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Per-cell state machine: Pending, then exactly one of Success or Failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CellOutcome {
    Pending,
    Success {
        image_url: String,
        /// Absent when the image was generated but the asset write failed
        asset_id: Option<AssetId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        persistence_warning: Option<String>,
    },
    Failed {
        error: CellError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub position: GridPosition,
    pub angle: String,
    pub lighting: String,
    pub prompt: String,
    #[serde(flatten)]
    pub outcome: CellOutcome,
}

impl MatrixCell {
    pub fn row(&self) -> usize {
        self.position.row()
    }

    pub fn col(&self) -> usize {
        self.position.col()
    }

    pub fn state(&self) -> CellState {
        match self.outcome {
            CellOutcome::Pending => CellState::Pending,
            CellOutcome::Success { .. } => CellState::Success,
            CellOutcome::Failed { .. } => CellState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state() == CellState::Success
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.outcome {
            CellOutcome::Success { image_url, .. } => Some(image_url),
            _ => None,
        }
    }

    pub fn asset_id(&self) -> Option<AssetId> {
        match &self.outcome {
            CellOutcome::Success { asset_id, .. } => *asset_id,
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CellError> {
        match &self.outcome {
            CellOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn persistence_warning(&self) -> Option<&str> {
        match &self.outcome {
            CellOutcome::Success {
                persistence_warning,
                ..
            } => persistence_warning.as_deref(),
            _ => None,
        }
    }
}

/// Aggregated outcome of one matrix call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixResult {
    pub seed: Seed,
    pub base_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub camera_angles: Vec<String>,
    pub lighting_styles: Vec<String>,
    /// Source asset for spawned matrices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<AssetId>,
    /// Exactly nine cells, row-major
    pub cells: Vec<MatrixCell>,
    pub successful_count: usize,
    pub created_at: DateTime<Utc>,
}

impl MatrixResult {
    /// Assemble from resolved cells; `successful_count` is derived, never passed in.
    pub(crate) fn from_cells(
        seed: Seed,
        axes: &ValidatedAxes,
        parent_id: Option<AssetId>,
        mut cells: Vec<MatrixCell>,
    ) -> Self {
        cells.sort_by_key(|c| c.position);
        debug_assert_eq!(cells.len(), CELL_COUNT);
        let successful_count = cells.iter().filter(|c| c.is_success()).count();
        Self {
            seed,
            base_prompt: axes.base_prompt.clone(),
            aspect_ratio: axes.aspect_ratio,
            camera_angles: axes.camera_angles.to_vec(),
            lighting_styles: axes.lighting_styles.to_vec(),
            parent_id,
            cells,
            successful_count,
            created_at: Utc::now(),
        }
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&MatrixCell> {
        let position = GridPosition::new(row, col)?;
        self.cells.get(position.index()).filter(|c| c.position == position)
    }

    pub fn is_complete(&self) -> bool {
        self.successful_count == CELL_COUNT
    }

    pub fn failed_cells(&self) -> Vec<&MatrixCell> {
        self.cells
            .iter()
            .filter(|c| c.state() == CellState::Failed)
            .collect()
    }

    /// Cells with an image but no stored asset, with the store error
    pub fn persistence_warnings(&self) -> Vec<(GridPosition, &str)> {
        self.cells
            .iter()
            .filter_map(|c| c.persistence_warning().map(|w| (c.position, w)))
            .collect()
    }
}
