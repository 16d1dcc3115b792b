use seedgrid::store::SledAssetStore;
use seedgrid::{AssetStore, CellState, EngineError, FileMetadata, MatrixRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::{engine_with, FlakyStore, ScriptedProvider};

#[tokio::test]
async fn write_failure_keeps_cell_successful_with_warning() {
    let provider = ScriptedProvider::new();
    let store = FlakyStore::new();
    store.set_fail_creates(true);
    let engine = engine_with(provider, store.clone());

    let result = engine
        .generate_matrix(&MatrixRequest::new("sneaker").with_seed(8))
        .await
        .unwrap();

    assert_eq!(result.successful_count, 9);
    for cell in &result.cells {
        assert_eq!(cell.state(), CellState::Success);
        assert!(cell.image_url().is_some());
        assert!(cell.asset_id().is_none());
        assert!(cell.persistence_warning().unwrap().contains("disk full"));
    }
    assert_eq!(result.persistence_warnings().len(), 9);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn mutation_write_failure_is_a_hard_error() {
    let provider = ScriptedProvider::new();
    let store = FlakyStore::new();
    let engine = engine_with(provider, store.clone());
    let matrix = engine
        .generate_matrix(&MatrixRequest::new("sneaker").with_seed(8))
        .await
        .unwrap();
    let source = matrix.get_cell(0, 0).unwrap().asset_id().unwrap();

    store.set_fail_creates(true);
    let mut changes = BTreeMap::new();
    changes.insert("lighting".to_string(), "backlit".to_string());
    let result = engine.mutate_cell(&source, &changes).await;

    assert!(matches!(result, Err(EngineError::Persistence(_))));
}

#[tokio::test]
async fn sled_store_round_trips_matrix_and_lineage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("assets");
    let provider = ScriptedProvider::new();

    let (matrix, mutated_id) = {
        let store = Arc::new(SledAssetStore::open(&path).unwrap());
        let engine = engine_with(provider, store.clone());
        let matrix = engine
            .generate_matrix(
                &MatrixRequest::new("espresso cup")
                    .with_seed(77)
                    .with_project("cafe"),
            )
            .await
            .unwrap();
        let source = matrix.get_cell(1, 1).unwrap().asset_id().unwrap();
        let mut changes = BTreeMap::new();
        changes.insert("angle".to_string(), "macro".to_string());
        let mutated = engine.mutate_cell(&source, &changes).await.unwrap();
        store.flush().unwrap();
        (matrix, mutated.id)
    };

    let store = SledAssetStore::open(&path).unwrap();
    let cells = store.list_matrix("cafe", 77).unwrap();
    assert_eq!(cells.len(), 9);
    for (stored, cell) in cells.iter().zip(&matrix.cells) {
        assert_eq!(stored.matrix_position, Some(cell.position));
        assert_eq!(Some(stored.id), cell.asset_id());
    }

    let mutated = store.get(&mutated_id).unwrap().unwrap();
    let source = matrix.get_cell(1, 1).unwrap().asset_id().unwrap();
    assert_eq!(mutated.parent_id, Some(source));
    assert_eq!(store.list_children(&source).unwrap()[0].id, mutated_id);
    assert_eq!(store.list_by_seed(77).unwrap().len(), 10);
}

#[test]
fn backfill_leaves_identity_untouched() {
    let dir = TempDir::new().unwrap();
    let store = SledAssetStore::open(dir.path().join("assets")).unwrap();
    let record = seedgrid::GenerationRecord {
        base_prompt: "vase".to_string(),
        angle: "front view".to_string(),
        lighting: "studio lighting".to_string(),
        seed: 12,
        aspect_ratio: seedgrid::AspectRatio::Portrait4x5,
        mode: seedgrid::GenerationMode::Matrix,
        provider: None,
        mutations: None,
    };
    let asset = store
        .create(
            seedgrid::AssetDraft::new("p", "vase, front view", &record)
                .unwrap()
                .with_image_url("https://cdn.test/vase.png"),
        )
        .unwrap();

    let updated = store
        .record_file_metadata(
            &asset.id,
            FileMetadata {
                image_path: Some("/data/vase.png".to_string()),
                checksum: Some("deadbeef".to_string()),
                ..FileMetadata::default()
            },
        )
        .unwrap();

    assert_eq!(updated.id, asset.id);
    assert_eq!(updated.seed, asset.seed);
    assert_eq!(updated.parent_id, asset.parent_id);
    assert_eq!(updated.json_payload, asset.json_payload);
    assert_eq!(updated.created_at, asset.created_at);
    assert_eq!(updated.file.checksum.as_deref(), Some("deadbeef"));
}
