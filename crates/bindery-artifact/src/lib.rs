//! Artifact protection, location, and restore reconciliation for Bindery.
//!
//! This crate implements the filesystem side of a packaging run: deriving the
//! canonical artifact path next to a project directory, renaming a
//! pre-existing artifact aside before the checker runs, locating whatever the
//! checker produced afterwards, and restoring the protected original without
//! data loss — as an explicit state machine with a single terminal restore
//! step reachable from every branch.

pub mod paths;
pub mod reconcile;

pub use paths::{backup_path, canonical_artifact_path, disambiguated_path, inner_artifact_path};
pub use reconcile::{validate_transition, ReconcileOutcome, ReconcileState, Reconciler};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a usable project directory: {0}")]
    InvalidProjectDir(String),
    #[error("invalid reconcile transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}
