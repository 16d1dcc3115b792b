//! CLI Tooling
//!
//! Command-line front end for matrix generation, mutation, spawning and
//! provenance queries against a local sled asset store.

use crate::config::{ConfigLoader, SeedgridConfig};
use crate::error::EngineError;
use crate::lineage::{LineageReport, LineageTracker};
use crate::logging::LoggingConfig;
use crate::matrix::{cancel_pair, MatrixEngine, MatrixRequest, MatrixResult, SpawnRequest};
use crate::provider::{GenerationProvider, HttpImageProvider};
use crate::store::{Asset, AssetStore, FileMetadata, GenerationMode, SledAssetStore};
use crate::types::{AssetId, Seed};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Seedgrid - seed-locked 3x3 image matrices with asset lineage
#[derive(Parser, Debug)]
#[command(name = "seedgrid")]
#[command(about = "Generate seed-locked 3x3 image matrices and track their lineage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings from config with command-line flags applied on top.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a 3x3 matrix
    Matrix {
        /// Base prompt shared by every cell
        prompt: String,
        /// Seed (random when omitted)
        #[arg(long)]
        seed: Option<Seed>,
        #[arg(long, default_value = "1:1")]
        aspect_ratio: String,
        /// Camera angle for a row; pass three times (defaults otherwise)
        #[arg(long = "angle")]
        angles: Vec<String>,
        /// Lighting style for a column; pass three times (defaults otherwise)
        #[arg(long = "lighting")]
        lighting: Vec<String>,
        #[arg(long)]
        project: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Generate one grid position
    Cell {
        prompt: String,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        col: usize,
        #[arg(long)]
        seed: Option<Seed>,
        #[arg(long, default_value = "1:1")]
        aspect_ratio: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Regenerate an asset with a new angle and/or lighting
    Mutate {
        asset_id: AssetId,
        #[arg(long)]
        angle: Option<String>,
        #[arg(long)]
        lighting: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Start a new matrix chained onto an existing asset
    Spawn {
        asset_id: AssetId,
        prompt: String,
        /// Seed (defaults to the source asset's)
        #[arg(long)]
        seed: Option<Seed>,
        #[arg(long)]
        aspect_ratio: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the chain from root to an asset
    Lineage {
        asset_id: AssetId,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List direct children of an asset
    Children {
        asset_id: AssetId,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show one asset
    Show {
        asset_id: AssetId,
    },
    /// List stored matrix cells for a seed
    Cells {
        seed: Seed,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List stored assets, optionally filtered
    Assets {
        #[arg(long)]
        project: Option<String>,
        /// Provider label recorded at generation time
        #[arg(long)]
        provider: Option<String>,
        /// matrix, single_cell, mutation or spawn
        #[arg(long)]
        mode: Option<GenerationMode>,
        /// File id recorded by backfill
        #[arg(long)]
        file_id: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Record downloaded file details for an asset
    Backfill {
        asset_id: AssetId,
        #[arg(long)]
        image_path: Option<String>,
        #[arg(long)]
        file_id: Option<String>,
        #[arg(long)]
        file_size: Option<u64>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        checksum: Option<String>,
    },
    /// Check provider configuration
    Provider,
}

/// CLI context: loaded config, opened store, and a runtime for async commands
pub struct CliContext {
    config: SeedgridConfig,
    store: Arc<dyn AssetStore>,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, EngineError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        let store_path = config.store.resolve_path()?;
        std::fs::create_dir_all(&store_path).map_err(|e| {
            EngineError::Persistence(format!(
                "Failed to create store directory {}: {}",
                store_path.display(),
                e
            ))
        })?;
        let store = Arc::new(SledAssetStore::open(&store_path)?);
        Self::with_store(config, store)
    }

    pub fn with_store(
        config: SeedgridConfig,
        store: Arc<dyn AssetStore>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::ConfigError(format!("Failed to start runtime: {}", e)))?;
        Ok(Self {
            config,
            store,
            runtime,
        })
    }

    pub fn config(&self) -> &SeedgridConfig {
        &self.config
    }

    fn engine(&self) -> Result<MatrixEngine, EngineError> {
        let provider: Arc<dyn GenerationProvider> =
            Arc::new(HttpImageProvider::new(self.config.provider.clone())?);
        MatrixEngine::new(provider, self.store.clone(), self.config.engine.clone())
    }

    fn lineage(&self) -> LineageTracker {
        LineageTracker::new(self.store.clone(), self.config.engine.max_lineage_depth)
    }

    /// Run a matrix call, cancelling in-flight cells on Ctrl-C.
    fn run_cancellable<F, Fut>(&self, call: F) -> Result<MatrixResult, EngineError>
    where
        F: FnOnce(crate::matrix::CancelSignal) -> Fut,
        Fut: Future<Output = Result<MatrixResult, EngineError>>,
    {
        let (handle, signal) = cancel_pair();
        self.runtime.block_on(async move {
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling matrix");
                    handle.cancel();
                }
            });
            let result = call(signal).await;
            watcher.abort();
            result
        })
    }

    pub fn execute(&self, command: &Commands) -> Result<String, EngineError> {
        match command {
            Commands::Matrix {
                prompt,
                seed,
                aspect_ratio,
                angles,
                lighting,
                project,
                format,
            } => {
                let mut request = MatrixRequest::new(prompt.clone())
                    .with_aspect_ratio(aspect_ratio.clone());
                request.seed = *seed;
                request.project_id = project.clone();
                if !angles.is_empty() {
                    request.camera_angles = angles.clone();
                }
                if !lighting.is_empty() {
                    request.lighting_styles = lighting.clone();
                }
                request.validate()?;
                let engine = self.engine()?;
                let result = self.run_cancellable(|signal| async move {
                    engine.generate_matrix_with_cancel(&request, &signal).await
                })?;
                info!(seed = result.seed, successful = result.successful_count, "Matrix command finished");
                render(format, &result, format_matrix_result)
            }
            Commands::Cell {
                prompt,
                row,
                col,
                seed,
                aspect_ratio,
                project,
                format,
            } => {
                let mut request = MatrixRequest::new(prompt.clone())
                    .with_aspect_ratio(aspect_ratio.clone());
                request.seed = *seed;
                request.project_id = project.clone();
                let engine = self.engine()?;
                let asset = self
                    .runtime
                    .block_on(engine.generate_single_cell(&request, *row, *col))?;
                render(format, &asset, |a| format_assets(std::slice::from_ref(a)))
            }
            Commands::Mutate {
                asset_id,
                angle,
                lighting,
                format,
            } => {
                let mut mutations = BTreeMap::new();
                if let Some(angle) = angle {
                    mutations.insert("angle".to_string(), angle.clone());
                }
                if let Some(lighting) = lighting {
                    mutations.insert("lighting".to_string(), lighting.clone());
                }
                let engine = self.engine()?;
                let asset = self
                    .runtime
                    .block_on(engine.mutate_cell(asset_id, &mutations))?;
                render(format, &asset, |a| format_assets(std::slice::from_ref(a)))
            }
            Commands::Spawn {
                asset_id,
                prompt,
                seed,
                aspect_ratio,
                format,
            } => {
                let mut request = SpawnRequest::new(*asset_id, prompt.clone());
                request.seed = *seed;
                request.aspect_ratio = aspect_ratio.clone();
                let engine = self.engine()?;
                let result = self.run_cancellable(|signal| async move {
                    engine.spawn_matrix_with_cancel(&request, &signal).await
                })?;
                render(format, &result, format_matrix_result)
            }
            Commands::Lineage { asset_id, format } => {
                let report = self.lineage().lineage_report(asset_id)?;
                render(format, &report, format_lineage_report)
            }
            Commands::Children { asset_id, format } => {
                let children = self.lineage().get_children(asset_id)?;
                render(format, &children, |c| format_assets(c))
            }
            Commands::Show { asset_id } => {
                let asset = self
                    .store
                    .get(asset_id)?
                    .ok_or(EngineError::NotFound(*asset_id))?;
                to_json(&asset)
            }
            Commands::Cells {
                seed,
                project,
                format,
            } => {
                let project = project
                    .clone()
                    .unwrap_or_else(|| self.config.engine.default_project_id.clone());
                let assets = self.store.list_matrix(&project, *seed)?;
                render(format, &assets, |a| format_assets(a))
            }
            Commands::Assets {
                project,
                provider,
                mode,
                file_id,
                format,
            } => {
                let mut assets: Vec<Asset> = match (file_id, project, provider, mode) {
                    (Some(file_id), ..) => {
                        self.store.find_by_file_id(file_id)?.into_iter().collect()
                    }
                    (None, Some(project), ..) => self.store.list_by_project(project)?,
                    (None, None, Some(provider), _) => self.store.list_by_provider(provider)?,
                    (None, None, None, Some(mode)) => self.store.list_by_mode(*mode)?,
                    (None, None, None, None) => self.store.list_all()?,
                };
                assets.retain(|a| {
                    project.as_deref().map_or(true, |p| a.project_id == p)
                        && provider.as_deref().map_or(true, |p| a.provider() == Some(p))
                        && mode.map_or(true, |m| a.mode() == Some(m))
                });
                render(format, &assets, |a| format_assets(a))
            }
            Commands::Backfill {
                asset_id,
                image_path,
                file_id,
                file_size,
                content_type,
                checksum,
            } => {
                let file = FileMetadata {
                    image_path: image_path.clone(),
                    file_id: file_id.clone(),
                    file_size: *file_size,
                    content_type: content_type.clone(),
                    checksum: checksum.clone(),
                };
                let asset = self.store.record_file_metadata(asset_id, file)?;
                to_json(&asset)
            }
            Commands::Provider => Ok(self.config.provider.diagnose().render()),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, EngineError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::Persistence(format!("Failed to serialize output: {}", e)))
}

fn render<T: serde::Serialize>(
    format: &str,
    value: &T,
    text: impl Fn(&T) -> String,
) -> Result<String, EngineError> {
    match format {
        "json" => to_json(value),
        "text" => Ok(text(value)),
        other => Err(EngineError::Validation(format!(
            "Unknown output format '{}' (expected text or json)",
            other
        ))),
    }
}

fn short_id(id: &AssetId) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Grid view: rows are camera angles, columns lighting styles
pub fn format_matrix_result(result: &MatrixResult) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    let mut header = vec![String::new()];
    header.extend(result.lighting_styles.iter().cloned());
    table.set_header(header);

    for (row, angle) in result.camera_angles.iter().enumerate() {
        let mut cells = vec![angle.clone()];
        for col in 0..result.lighting_styles.len() {
            let summary = match result.get_cell(row, col) {
                Some(cell) => match (cell.image_url(), cell.error()) {
                    (Some(url), _) => match cell.asset_id() {
                        Some(id) => format!("{}\n{}", short_id(&id), url),
                        None => format!("unsaved\n{}", url),
                    },
                    (None, Some(error)) => format!("failed: {}", error),
                    (None, None) => "pending".to_string(),
                },
                None => "-".to_string(),
            };
            cells.push(summary);
        }
        table.add_row(cells);
    }

    let mut output = format!(
        "Seed: {}\nSuccessful: {}/{}\n",
        result.seed,
        result.successful_count,
        result.cells.len()
    );
    if let Some(parent_id) = result.parent_id {
        output.push_str(&format!("Spawned from: {}\n", parent_id));
    }
    output.push_str(&table.to_string());
    for (position, warning) in result.persistence_warnings() {
        output.push_str(&format!("\nwarning: cell {} not saved: {}", position, warning));
    }
    output
}

pub fn format_assets(assets: &[Asset]) -> String {
    if assets.is_empty() {
        return "No assets found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Asset", "Parent", "Seed", "Position", "Mode", "Prompt"]);
    for asset in assets {
        table.add_row(vec![
            asset.id.to_string(),
            asset
                .parent_id
                .map(|p| short_id(&p))
                .unwrap_or_else(|| "-".to_string()),
            asset.seed.to_string(),
            asset
                .matrix_position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            asset
                .mode()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            asset.prompt.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_lineage_report(report: &LineageReport) -> String {
    let mut output = String::from("Lineage (root first):\n");
    for (depth, asset) in report.chain.iter().enumerate() {
        output.push_str(&format!(
            "{}{} seed={} {}\n",
            "  ".repeat(depth),
            asset.id,
            asset.seed,
            asset.prompt
        ));
    }
    output.push_str(&format!(
        "Children: {}\nDescendants: {}",
        report.children.len(),
        report.descendant_count
    ));
    output
}
