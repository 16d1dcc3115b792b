use seedgrid::matrix::prompt::build_cell_prompt;
use seedgrid::{
    AssetStore, CellError, CellState, EngineError, GridPosition, MatrixRequest, MAX_SEED,
};

use crate::support::{engine, strings, ScriptedProvider};

fn watch_request() -> MatrixRequest {
    MatrixRequest::new("watch on marble")
        .with_aspect_ratio("1:1")
        .with_axes(
            strings(&["front_view", "side_view", "top_down"]),
            strings(&["golden_hour", "studio_three_point", "rim_lighting"]),
        )
}

#[tokio::test]
async fn all_success_fills_every_cell() {
    let provider = ScriptedProvider::new();
    let (engine, store) = engine(provider.clone());

    let result = engine.generate_matrix(&watch_request()).await.unwrap();

    assert!(result.seed <= MAX_SEED);
    assert_eq!(result.successful_count, 9);
    assert!(result.is_complete());
    let first = result.get_cell(0, 0).unwrap();
    assert!(first.prompt.contains("watch on marble"));
    assert!(first.prompt.contains("front_view"));
    assert!(first.prompt.contains("golden_hour"));

    let calls = provider.calls();
    assert_eq!(calls.len(), 9);
    assert!(calls.iter().all(|c| c.seed == result.seed && c.aspect_ratio == "1:1"));

    for cell in &result.cells {
        let asset = store.get(&cell.asset_id().unwrap()).unwrap().unwrap();
        assert_eq!(asset.matrix_position, Some(cell.position));
        assert_eq!(asset.seed, result.seed);
        assert_eq!(asset.image_url.as_deref(), cell.image_url());
        assert!(asset.parent_id.is_none());
    }
    assert_eq!(store.list_matrix("default", result.seed).unwrap().len(), 9);
}

#[tokio::test]
async fn fixed_seed_repeats_identical_submissions() {
    let provider = ScriptedProvider::new();
    let (engine, _store) = engine(provider.clone());
    let request = watch_request().with_seed(42);
    let target = build_cell_prompt("watch on marble", "side_view", "rim_lighting");

    let first = engine.generate_matrix(&request).await.unwrap();
    let first_calls = provider.sorted_calls();
    let first_target = provider.call_for(&target).unwrap();
    provider.clear_calls();

    let second = engine.generate_matrix(&request).await.unwrap();
    let second_target = provider.call_for(&target).unwrap();

    assert_eq!(first.seed, 42);
    assert_eq!(second.seed, 42);
    assert_eq!(first_target, second_target);
    assert_eq!(first_calls, provider.sorted_calls());
    assert_eq!(first.get_cell(1, 2).unwrap().prompt, target);
}

#[tokio::test]
async fn failed_cells_do_not_affect_the_rest() {
    let provider = ScriptedProvider::new();
    provider.fail_cell("watch on marble", "front_view", "studio_three_point");
    provider.fail_cell("watch on marble", "top_down", "rim_lighting");
    let (engine, store) = engine(provider.clone());

    let result = engine
        .generate_matrix(&watch_request().with_seed(7))
        .await
        .unwrap();

    assert_eq!(result.successful_count, 7);
    for (row, col) in [(0, 1), (2, 2)] {
        let cell = result.get_cell(row, col).unwrap();
        assert_eq!(cell.state(), CellState::Failed);
        assert!(cell.image_url().is_none());
        assert!(cell.asset_id().is_none());
        assert!(matches!(cell.error(), Some(CellError::Provider(_))));
    }
    let failed: Vec<GridPosition> = result.failed_cells().iter().map(|c| c.position).collect();
    assert_eq!(
        failed,
        vec![GridPosition::new(0, 1).unwrap(), GridPosition::new(2, 2).unwrap()]
    );
    assert_eq!(store.len(), 7);
    assert_eq!(provider.calls().len(), 9);
}

#[tokio::test]
async fn all_cells_failing_is_a_request_error() {
    let provider = ScriptedProvider::failing_all();
    let (engine, store) = engine(provider);

    let err = engine
        .generate_matrix(&watch_request().with_seed(5))
        .await
        .unwrap_err();

    match err {
        EngineError::AllCellsFailed { seed, failures } => {
            assert_eq!(seed, 5);
            let positions: Vec<GridPosition> = failures.iter().map(|(p, _)| *p).collect();
            assert_eq!(positions, GridPosition::all().collect::<Vec<_>>());
        }
        other => panic!("Expected AllCellsFailed, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn cells_keep_grid_order_regardless_of_completion_order() {
    let provider = ScriptedProvider::staggered();
    let (engine, _store) = engine(provider);

    let result = engine
        .generate_matrix(&watch_request().with_seed(9))
        .await
        .unwrap();

    for (i, cell) in result.cells.iter().enumerate() {
        let position = cell.position;
        assert_eq!(position.index(), i);
        assert_eq!(
            cell.prompt,
            build_cell_prompt(
                "watch on marble",
                &result.camera_angles[position.row()],
                &result.lighting_styles[position.col()]
            )
        );
    }
}

#[tokio::test]
async fn invalid_requests_never_dispatch() {
    let provider = ScriptedProvider::new();
    let (engine, _store) = engine(provider.clone());

    let cases = [
        watch_request().with_axes(strings(&["a", "b"]), strings(&["x", "y", "z"])),
        watch_request().with_axes(strings(&["a", "b", "c"]), strings(&["x", "", "z"])),
        watch_request().with_aspect_ratio("7:3"),
        watch_request().with_seed(MAX_SEED + 1),
        MatrixRequest::new("   "),
    ];
    for request in &cases {
        assert!(matches!(
            engine.generate_matrix(request).await,
            Err(EngineError::Validation(_))
        ));
    }
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn result_serializes_seed_and_count() {
    let provider = ScriptedProvider::new();
    let (engine, _store) = engine(provider);
    let result = engine
        .generate_matrix(&watch_request().with_seed(1234))
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["seed"], 1234);
    assert_eq!(json["successful_count"], 9);
    assert_eq!(json["cells"].as_array().unwrap().len(), 9);
    assert_eq!(json["cells"][5]["position"], "1,2");
    assert_eq!(json["cells"][5]["state"], "success");
}
