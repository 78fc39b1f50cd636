//! Validation orchestration engine for Bindery.
//!
//! This crate ties together the process invoker, the artifact reconciler, and
//! the result schema into the `Runner` — the central API for driving the
//! external checker against one project directory and classifying what came
//! back. It also provides the diagnostic mapper that turns checker messages
//! into editor-agnostic, location-anchored diagnostics.

pub mod diagnostics;
pub mod outcome;
pub mod runner;

pub use diagnostics::{
    map_batch, map_report, Diagnostic, DiagnosticLevel, FileLineCache, Position, Range,
};
pub use outcome::{RunOutcome, RunReport};
pub use runner::Runner;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("artifact error: {0}")]
    Artifact(#[from] bindery_artifact::ArtifactError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
