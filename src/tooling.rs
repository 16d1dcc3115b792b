//! Tooling & Integration Layer
//!
//! Command-line access to the matrix engine and the local asset store.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
