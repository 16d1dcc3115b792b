use seedgrid::{cancel_pair, CellError, CellState, EngineError, MatrixRequest, SpawnRequest};
use std::time::Duration;

use crate::support::{engine, ScriptedProvider};

#[tokio::test]
async fn cancel_marks_unresolved_cells_failed() {
    let provider = ScriptedProvider::new();
    provider.hang_cell("desk lamp", "side view", "neon lighting");
    provider.hang_cell("desk lamp", "top-down view", "natural sunlight");
    let (engine, store) = engine(provider);
    let (handle, signal) = cancel_pair();

    let request = MatrixRequest::new("desk lamp").with_seed(3);
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(engine.generate_matrix_with_cancel(&request, &signal), canceller);
    let result = result.unwrap();

    assert_eq!(result.successful_count, 7);
    for (row, col) in [(1, 1), (2, 2)] {
        let cell = result.get_cell(row, col).unwrap();
        assert_eq!(cell.state(), CellState::Failed);
        assert_eq!(cell.error(), Some(&CellError::Cancelled));
    }
    assert!(result.cells.iter().all(|c| c.state() != CellState::Pending));
    assert_eq!(store.len(), 7);
}

#[tokio::test]
async fn cancel_with_no_successes_reports_cancelled() {
    let provider = ScriptedProvider::hanging_all();
    let (engine, store) = engine(provider);
    let (handle, signal) = cancel_pair();

    let request = MatrixRequest::new("desk lamp");
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(engine.generate_matrix_with_cancel(&request, &signal), canceller);

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn pre_cancelled_spawn_never_dispatches() {
    let provider = ScriptedProvider::new();
    let (engine, _store) = engine(provider.clone());
    let matrix = engine
        .generate_matrix(&MatrixRequest::new("desk lamp").with_seed(4))
        .await
        .unwrap();
    let source = matrix.get_cell(0, 0).unwrap().asset_id().unwrap();
    provider.clear_calls();

    let (handle, signal) = cancel_pair();
    handle.cancel();
    let result = engine
        .spawn_matrix_with_cancel(&SpawnRequest::new(source, "floor lamp"), &signal)
        .await;
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(provider.calls().is_empty());
}
