//! Matrix engine: fans a request out to the provider and joins the results.
//!
//! The engine keeps no state between calls. Each call owns its plan of nine
//! cells; every dispatch writes only its own cell, and the result is built
//! from the join.

use super::cancel::CancelSignal;
use super::mutation::AxisMutation;
use super::prompt::build_cell_prompt;
use super::{
    CellError, CellOutcome, MatrixCell, MatrixRequest, MatrixResult, SpawnRequest, ValidatedAxes,
};
use crate::error::{EngineError, ProviderError, StoreError};
use crate::lineage::{LineageTracker, DEFAULT_MAX_LINEAGE_DEPTH};
use crate::provider::{GenerationProvider, ImageResult};
use crate::store::{Asset, AssetDraft, AssetStore, GenerationMode, GenerationRecord};
use crate::types::{AspectRatio, AssetId, GridPosition, ProjectId, Seed, MAX_SEED};
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Engine tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on in-flight provider calls per matrix; None dispatches all nine at once
    pub max_concurrent_dispatches: Option<usize>,
    /// Per-dispatch timeout
    pub dispatch_timeout_ms: u64,
    pub max_lineage_depth: usize,
    /// Project used when a request names none
    pub default_project_id: ProjectId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: None,
            dispatch_timeout_ms: 60_000,
            max_lineage_depth: DEFAULT_MAX_LINEAGE_DEPTH,
            default_project_id: "default".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_dispatches == Some(0) {
            return Err("engine.max_concurrent_dispatches must be at least 1".to_string());
        }
        if self.dispatch_timeout_ms == 0 {
            return Err("engine.dispatch_timeout_ms must be positive".to_string());
        }
        if self.max_lineage_depth == 0 {
            return Err("engine.max_lineage_depth must be at least 1".to_string());
        }
        if self.default_project_id.trim().is_empty() {
            return Err("engine.default_project_id cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

/// Everything fixed for the lifetime of one matrix call
struct MatrixRun {
    project_id: ProjectId,
    seed: Seed,
    axes: ValidatedAxes,
    parent_id: Option<AssetId>,
    mode: GenerationMode,
}

pub struct MatrixEngine {
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn AssetStore>,
    lineage: LineageTracker,
    config: EngineConfig,
}

impl MatrixEngine {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn AssetStore>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::ConfigError)?;
        let lineage = LineageTracker::new(store.clone(), config.max_lineage_depth);
        Ok(Self {
            provider,
            store,
            lineage,
            config,
        })
    }

    pub fn lineage(&self) -> &LineageTracker {
        &self.lineage
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn generate_matrix(&self, request: &MatrixRequest) -> Result<MatrixResult, EngineError> {
        self.generate_matrix_with_cancel(request, &CancelSignal::never())
            .await
    }

    /// Generate nine cells sharing one seed.
    ///
    /// Returns a result whenever at least one cell succeeds. Fails with
    /// `AllCellsFailed` when none do, or `Cancelled` when none do and the
    /// signal fired.
    pub async fn generate_matrix_with_cancel(
        &self,
        request: &MatrixRequest,
        cancel: &CancelSignal,
    ) -> Result<MatrixResult, EngineError> {
        let axes = request.validate()?;
        let run = MatrixRun {
            project_id: self.project_for(request.project_id.as_deref()),
            seed: request.seed.unwrap_or_else(draw_seed),
            axes,
            parent_id: None,
            mode: GenerationMode::Matrix,
        };
        self.run_matrix(run, cancel).await
    }

    pub async fn spawn_matrix(&self, request: &SpawnRequest) -> Result<MatrixResult, EngineError> {
        self.spawn_matrix_with_cancel(request, &CancelSignal::never())
            .await
    }

    /// Generate a new matrix whose assets all point back at the source asset.
    ///
    /// Seed and aspect ratio default to the source's; axes default to the
    /// built-in set.
    pub async fn spawn_matrix_with_cancel(
        &self,
        request: &SpawnRequest,
        cancel: &CancelSignal,
    ) -> Result<MatrixResult, EngineError> {
        let source = self.lineage.ensure_attachable(&request.source_asset_id)?;

        let mut matrix_request = MatrixRequest::new(request.base_prompt.clone())
            .with_project(source.project_id.clone())
            .with_seed(request.seed.unwrap_or(source.seed))
            .with_aspect_ratio(
                request
                    .aspect_ratio
                    .clone()
                    .unwrap_or_else(|| source.aspect_ratio.as_str().to_string()),
            );
        if let Some(angles) = &request.camera_angles {
            matrix_request.camera_angles = angles.clone();
        }
        if let Some(lighting) = &request.lighting_styles {
            matrix_request.lighting_styles = lighting.clone();
        }
        let axes = matrix_request.validate()?;

        let run = MatrixRun {
            project_id: source.project_id,
            seed: request.seed.unwrap_or(source.seed),
            axes,
            parent_id: Some(source.id),
            mode: GenerationMode::Spawn,
        };
        self.run_matrix(run, cancel).await
    }

    /// Regenerate a recorded asset with one or both axes replaced.
    ///
    /// Single dispatch: provider and persistence failures are terminal.
    pub async fn mutate_cell<'a, I>(
        &self,
        asset_id: &AssetId,
        mutations: I,
    ) -> Result<Asset, EngineError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mutation = AxisMutation::parse(mutations)?;
        let source = self.lineage.ensure_attachable(asset_id)?;
        let mut record = mutation.apply(&source.generation_record()?);
        record.mode = GenerationMode::Mutation;
        record.provider = Some(self.provider.name().to_string());

        let prompt = build_cell_prompt(&record.base_prompt, &record.angle, &record.lighting);
        debug!(
            asset_id = %asset_id,
            seed = record.seed,
            angle = %record.angle,
            lighting = %record.lighting,
            "Dispatching mutation"
        );
        let start = Instant::now();
        let image = self
            .dispatch(&prompt, record.seed, record.aspect_ratio)
            .await
            .map_err(|e| {
                error!(asset_id = %asset_id, error = %e, "Mutation dispatch failed");
                EngineError::Provider(e)
            })?;

        let draft = AssetDraft::new(source.project_id.clone(), prompt, &record)?
            .with_parent(Some(source.id))
            .with_image_url(image.image_url);
        let asset = self
            .store_draft(draft)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        info!(
            asset_id = %asset.id,
            parent_id = %source.id,
            seed = asset.seed,
            duration_ms = start.elapsed().as_millis(),
            "Mutation completed"
        );
        Ok(asset)
    }

    /// Generate one grid position of a matrix request and store it as a root asset.
    pub async fn generate_single_cell(
        &self,
        request: &MatrixRequest,
        row: usize,
        col: usize,
    ) -> Result<Asset, EngineError> {
        let axes = request.validate()?;
        let position = GridPosition::new(row, col).ok_or_else(|| {
            EngineError::Validation(format!("Cell ({}, {}) is outside the 3x3 grid", row, col))
        })?;
        let run = MatrixRun {
            project_id: self.project_for(request.project_id.as_deref()),
            seed: request.seed.unwrap_or_else(draw_seed),
            axes,
            parent_id: None,
            mode: GenerationMode::SingleCell,
        };
        let cell = run.axes.plan_cell(position);

        let image = self
            .dispatch(&cell.prompt, run.seed, run.axes.aspect_ratio)
            .await?;
        let asset = self
            .persist_cell(&run, &cell, &image)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        info!(asset_id = %asset.id, seed = run.seed, row, col, "Single cell generated");
        Ok(asset)
    }

    fn project_for(&self, requested: Option<&str>) -> ProjectId {
        requested
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_project_id.clone())
    }

    async fn run_matrix(
        &self,
        run: MatrixRun,
        cancel: &CancelSignal,
    ) -> Result<MatrixResult, EngineError> {
        info!(
            seed = run.seed,
            project_id = %run.project_id,
            parent_id = ?run.parent_id,
            aspect_ratio = %run.axes.aspect_ratio,
            "Starting matrix generation"
        );
        let start = Instant::now();
        let gate = self
            .config
            .max_concurrent_dispatches
            .map(Semaphore::new);

        let pending = run
            .axes
            .plan_cells()
            .into_iter()
            .map(|cell| self.resolve_cell(&run, cell, gate.as_ref(), cancel));
        let cells = join_all(pending).await;

        let result = MatrixResult::from_cells(run.seed, &run.axes, run.parent_id, cells);
        if result.successful_count == 0 {
            if cancel.is_cancelled() {
                warn!(seed = run.seed, "Matrix cancelled before any cell succeeded");
                return Err(EngineError::Cancelled);
            }
            let failures: Vec<(GridPosition, String)> = result
                .cells
                .iter()
                .map(|c| {
                    let reason = c.error().map(|e| e.to_string()).unwrap_or_default();
                    (c.position, reason)
                })
                .collect();
            error!(seed = run.seed, "All matrix cells failed");
            return Err(EngineError::AllCellsFailed {
                seed: run.seed,
                failures,
            });
        }

        info!(
            seed = run.seed,
            successful = result.successful_count,
            failed = result.failed_cells().len(),
            duration_ms = start.elapsed().as_millis(),
            "Matrix generation completed"
        );
        Ok(result)
    }

    /// Drive one cell from Pending to Success or Failed.
    async fn resolve_cell(
        &self,
        run: &MatrixRun,
        mut cell: MatrixCell,
        gate: Option<&Semaphore>,
        cancel: &CancelSignal,
    ) -> MatrixCell {
        let (row, col) = (cell.row(), cell.col());
        let dispatched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CellError::Cancelled),
            result = self.dispatch_gated(&cell.prompt, run.seed, run.axes.aspect_ratio, gate) => {
                result.map_err(CellError::Provider)
            }
        };

        cell.outcome = match dispatched {
            Ok(image) => {
                let (asset_id, persistence_warning) = match self.persist_cell(run, &cell, &image).await {
                    Ok(asset) => (Some(asset.id), None),
                    Err(e) => {
                        warn!(seed = run.seed, row, col, error = %e, "Cell generated but asset write failed");
                        (None, Some(e.to_string()))
                    }
                };
                debug!(seed = run.seed, row, col, asset_id = ?asset_id, "Cell succeeded");
                CellOutcome::Success {
                    image_url: image.image_url,
                    asset_id,
                    persistence_warning,
                }
            }
            Err(CellError::Cancelled) => {
                warn!(seed = run.seed, row, col, "Cell cancelled");
                CellOutcome::Failed {
                    error: CellError::Cancelled,
                }
            }
            Err(error) => {
                error!(seed = run.seed, row, col, error = %error, "Cell dispatch failed");
                CellOutcome::Failed { error }
            }
        };
        cell
    }

    async fn dispatch_gated(
        &self,
        prompt: &str,
        seed: Seed,
        aspect_ratio: AspectRatio,
        gate: Option<&Semaphore>,
    ) -> Result<ImageResult, ProviderError> {
        let _permit = match gate {
            Some(gate) => Some(
                gate.acquire()
                    .await
                    .map_err(|_| ProviderError::unknown("Dispatch gate closed"))?,
            ),
            None => None,
        };
        self.dispatch(prompt, seed, aspect_ratio).await
    }

    async fn dispatch(
        &self,
        prompt: &str,
        seed: Seed,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageResult, ProviderError> {
        let timeout = self.config.dispatch_timeout();
        match tokio::time::timeout(timeout, self.provider.submit(prompt, seed, aspect_ratio)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(format!(
                "No response from {} within {}ms",
                self.provider.name(),
                timeout.as_millis()
            ))),
        }
    }

    async fn persist_cell(
        &self,
        run: &MatrixRun,
        cell: &MatrixCell,
        image: &ImageResult,
    ) -> Result<Asset, StoreError> {
        let record = GenerationRecord {
            base_prompt: run.axes.base_prompt.clone(),
            angle: cell.angle.clone(),
            lighting: cell.lighting.clone(),
            seed: run.seed,
            aspect_ratio: run.axes.aspect_ratio,
            mode: run.mode,
            provider: Some(self.provider.name().to_string()),
            mutations: None,
        };
        let draft = AssetDraft::new(run.project_id.clone(), cell.prompt.clone(), &record)?
            .with_parent(run.parent_id)
            .with_position(Some(cell.position))
            .with_image_url(image.image_url.clone());
        self.store_draft(draft).await
    }

    /// Run a store write on the blocking pool.
    ///
    /// `AssetStore` is synchronous; the joined cells share one task, so a
    /// write on it would stall every other cell.
    async fn store_draft(&self, draft: AssetDraft) -> Result<Asset, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.create(draft))
            .await
            .map_err(|e| StoreError::Backend(format!("Asset write task failed: {}", e)))?
    }
}

fn draw_seed() -> Seed {
    rand::thread_rng().gen_range(0..=MAX_SEED)
}
