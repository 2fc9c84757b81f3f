//! CLI module for pendular.
//!
//! A headless presenter over [`crate::engine::SimContext`]. The entry point
//! `run_cli` is called from main.rs with parsed arguments.

mod args;
mod commands;
mod output;

pub use args::{Args, Command, DEFAULT_DURATION, DEFAULT_VERIFY_RUNS};
pub use commands::{
    check_scenario, run_cli, run_scenario, simulate, verify, verify_reproducibility, RunOverrides,
    RunSummary, VerifySummary,
};
pub use output::{
    format_check_result, format_run_summary, format_verify_summary, print_help, print_version,
    version_text,
};
