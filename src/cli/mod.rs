//! CLI module
//!
//! Command-line interface for running ingestion batches.
//!
//! # Commands
//!
//! - `run` - Fetch, normalize and write one batch
//! - `validate` - Check the configuration and the configured cities

mod commands;
mod runner;

pub use commands::{Cli, Commands, SummaryFormat};
pub use runner::{render_summary, Runner};
