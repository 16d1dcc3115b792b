//! Integration tests for the seedgrid matrix engine

mod cancellation;
mod matrix_scenarios;
mod persistence;
mod properties;
mod support;
