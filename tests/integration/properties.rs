use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use seedgrid::matrix::prompt::build_cell_prompt;
use seedgrid::{CellState, EngineError, GridPosition, MatrixRequest, MAX_SEED};
use std::collections::HashSet;

use crate::support::{engine, ScriptedProvider};

fn arb_axis_value() -> impl Strategy<Value = String> {
    "[a-z][a-z _-]{0,15}".prop_map(|s| s.trim().to_string())
}

fn arb_axis() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_axis_value(), 3)
}

fn arb_request() -> impl Strategy<Value = MatrixRequest> {
    (
        "[a-z][a-z ]{0,40}",
        0..=MAX_SEED,
        prop::sample::select(vec!["1:1", "4:5", "16:9", "2:3"]),
        arb_axis(),
        arb_axis(),
    )
        .prop_map(|(prompt, seed, ratio, angles, lighting)| {
            MatrixRequest::new(prompt)
                .with_seed(seed)
                .with_aspect_ratio(ratio)
                .with_axes(angles, lighting)
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn identical_requests_submit_identical_triples() {
    let rt = runtime();
    let mut runner = TestRunner::new(Config::with_cases(64));
    runner
        .run(&arb_request(), |request| {
            let provider = ScriptedProvider::new();
            let (engine, _store) = engine(provider.clone());

            let first = rt.block_on(engine.generate_matrix(&request)).unwrap();
            let first_calls = provider.sorted_calls();
            provider.clear_calls();
            let second = rt.block_on(engine.generate_matrix(&request)).unwrap();

            prop_assert_eq!(first.seed, second.seed);
            prop_assert_eq!(&first_calls, &provider.sorted_calls());
            prop_assert_eq!(first_calls.len(), 9);
            prop_assert!(first_calls.iter().all(|c| c.seed == first.seed));
            for (a, b) in first.cells.iter().zip(&second.cells) {
                prop_assert_eq!(&a.prompt, &b.prompt);
                prop_assert_eq!(a.position, b.position);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn positions_form_a_bijection_onto_the_grid() {
    let rt = runtime();
    let mut runner = TestRunner::new(Config::with_cases(32));
    runner
        .run(&arb_request(), |request| {
            let (engine, _store) = engine(ScriptedProvider::new());
            let result = rt.block_on(engine.generate_matrix(&request)).unwrap();

            let positions: HashSet<GridPosition> = result.cells.iter().map(|c| c.position).collect();
            prop_assert_eq!(result.cells.len(), 9);
            prop_assert_eq!(positions, GridPosition::all().collect::<HashSet<_>>());
            for cell in &result.cells {
                let expected = build_cell_prompt(
                    &result.base_prompt,
                    &result.camera_angles[cell.row()],
                    &result.lighting_styles[cell.col()],
                );
                prop_assert_eq!(&cell.prompt, &expected);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn successful_count_matches_cell_states() {
    let rt = runtime();
    let mut runner = TestRunner::new(Config::with_cases(64));
    let strategy = (arb_request(), 0u16..512);
    runner
        .run(&strategy, |(request, failure_mask)| {
            let provider = ScriptedProvider::new();
            let axes = request.validate().unwrap();
            for position in GridPosition::all() {
                if failure_mask & (1 << position.index()) != 0 {
                    provider.fail_cell(
                        &axes.base_prompt,
                        &axes.camera_angles[position.row()],
                        &axes.lighting_styles[position.col()],
                    );
                }
            }
            // Duplicate axis values can make two cells share a prompt
            let failing_prompts: HashSet<String> = GridPosition::all()
                .filter(|p| failure_mask & (1 << p.index()) != 0)
                .map(|p| axes.plan_cell(p).prompt)
                .collect();
            let expected_successes = axes
                .plan_cells()
                .iter()
                .filter(|c| !failing_prompts.contains(&c.prompt))
                .count();

            let (engine, _store) = engine(provider);
            match rt.block_on(engine.generate_matrix(&request)) {
                Ok(result) => {
                    let successes = result
                        .cells
                        .iter()
                        .filter(|c| c.state() == CellState::Success)
                        .count();
                    prop_assert_eq!(result.successful_count, successes);
                    prop_assert_eq!(result.successful_count, expected_successes);
                    prop_assert!(result.successful_count >= 1 && result.successful_count <= 9);
                    prop_assert!(result.cells.iter().all(|c| c.state() != CellState::Pending));
                }
                Err(EngineError::AllCellsFailed { failures, .. }) => {
                    prop_assert_eq!(expected_successes, 0);
                    prop_assert_eq!(failures.len(), 9);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            Ok(())
        })
        .unwrap();
}
