//! Seedgrid: Deterministic Matrix Generation
//!
//! Expands one base prompt into a seed-locked 3x3 grid of axis-bound variants,
//! dispatches them to a pluggable image provider, aggregates partial failures
//! into a single result, and tracks the parent/child lineage created by
//! mutating or re-spawning cells.

pub mod config;
pub mod error;
pub mod lineage;
pub mod logging;
pub mod matrix;
pub mod provider;
pub mod store;
pub mod tooling;
pub mod types;

pub use error::{EngineError, ProviderError, ProviderErrorKind, StoreError};
pub use lineage::{LineageReport, LineageTracker};
pub use matrix::{
    cancel_pair, CancelHandle, CancelSignal, CellError, CellOutcome, CellState, EngineConfig,
    MatrixCell, MatrixEngine, MatrixRequest, MatrixResult, SpawnRequest,
};
pub use provider::{GenerationProvider, ImageResult};
pub use store::{Asset, AssetDraft, AssetStore, FileMetadata, GenerationMode, GenerationRecord};
pub use types::{AspectRatio, AssetId, GridPosition, ProjectId, Seed, MAX_SEED};
