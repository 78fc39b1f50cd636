//! Bounded child-process invocation for Bindery.
//!
//! This crate implements the execution layer: spawning the external checker
//! (or any other helper executable) with an argument list and a wall-clock
//! limit, capturing standard error in full, and reporting exit, timeout, and
//! missing-binary conditions distinctly.

pub mod invoke;

pub use invoke::{invoke, InvokeOutcome, InvokeResult};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable not found: {0}")]
    NotFound(String),
    #[error("failed to spawn '{binary}': {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}
