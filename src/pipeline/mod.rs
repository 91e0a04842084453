//! Pipeline orchestration
//!
//! Sequences validation, collection, normalization and writing for one
//! batch, and folds every per-city outcome into a [`RunSummary`].
//!
//! # State Machine
//!
//! `Configured → Validating → Collecting → Normalizing → Writing → Completed`
//!
//! `Failed` is reachable from any non-terminal stage on an unrecoverable
//! condition. `Cancelled` is reachable before writing starts.

mod orchestrator;
mod state;
mod summary;

pub use orchestrator::{Pipeline, PipelineContext};
pub use state::RunState;
pub use summary::{CityDisposition, CityOutcome, RunBatch, RunSummary};

#[cfg(test)]
mod tests;
