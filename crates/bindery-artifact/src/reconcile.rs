use crate::paths::{backup_path, canonical_artifact_path, disambiguated_path, inner_artifact_path};
use crate::ArtifactError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-run reconciliation phase. Every run walks
/// `Start -> Protected -> Invoked -> Located -> Restored -> End`; the restore
/// step is the single terminal action and runs on every branch, so a created
/// backup can never be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Start,
    Protected,
    Invoked,
    Located,
    Restored,
    End,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Protected => "protected",
            Self::Invoked => "invoked",
            Self::Located => "located",
            Self::Restored => "restored",
            Self::End => "end",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: ReconcileState, to: ReconcileState) -> Result<(), ArtifactError> {
    use ReconcileState::{End, Invoked, Located, Protected, Restored, Start};
    let valid = matches!(
        (from, to),
        (Start, Protected)
            | (Protected, Invoked)
            | (Invoked, Located)
            | (Located, Restored)
            | (Restored, End)
    );

    if valid {
        Ok(())
    } else {
        Err(ArtifactError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// What reconciliation found and did, reported once the run reaches `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Where the newly produced artifact ended up, if one was produced.
    pub artifact_path: Option<PathBuf>,
    /// Where the protected original was restored to, if a backup was taken.
    pub backup_restored_to: Option<PathBuf>,
    /// Best-effort failures along the way, for the caller-facing report.
    /// Never escalated: a failed rename degrades placement, it does not
    /// abort the run.
    pub notes: Vec<String>,
}

/// Brackets one checker invocation around one project directory.
///
/// Usage is strictly `protect()` -> (run the tool) -> `mark_invoked()` ->
/// `finish()`. `finish()` consumes the reconciler and is the only way to
/// obtain the outcome, so no caller branch can skip restoration.
#[derive(Debug)]
pub struct Reconciler {
    canonical: PathBuf,
    inner: PathBuf,
    backup: Option<PathBuf>,
    state: ReconcileState,
    notes: Vec<String>,
}

impl Reconciler {
    pub fn new(project_dir: &Path) -> Result<Self, ArtifactError> {
        Ok(Self {
            canonical: canonical_artifact_path(project_dir)?,
            inner: inner_artifact_path(project_dir)?,
            backup: None,
            state: ReconcileState::Start,
            notes: Vec::new(),
        })
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Rename an existing canonical artifact aside to a hidden, timestamped
    /// backup. Best-effort: a failed rename is noted and the run proceeds
    /// unprotected rather than blocking validation.
    pub fn protect(&mut self) -> Result<(), ArtifactError> {
        validate_transition(self.state, ReconcileState::Protected)?;
        self.state = ReconcileState::Protected;

        if !self.canonical.exists() {
            return Ok(());
        }

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();
        let mut target = backup_path(&self.canonical, &timestamp);
        // A stale backup from a crashed run keeps its name; never overwrite it.
        let mut n = 2;
        while target.exists() {
            target = backup_path(&self.canonical, &format!("{timestamp}-{n}"));
            n += 1;
        }

        match fs::rename(&self.canonical, &target) {
            Ok(()) => {
                debug!(
                    "protected existing artifact: {} -> {}",
                    self.canonical.display(),
                    target.display()
                );
                self.backup = Some(target);
            }
            Err(e) => {
                warn!(
                    "could not protect existing artifact {}: {e}",
                    self.canonical.display()
                );
                self.notes.push(format!(
                    "existing artifact at {} could not be set aside: {e}",
                    self.canonical.display()
                ));
            }
        }
        Ok(())
    }

    /// Record that the external tool has run (successfully or not).
    pub fn mark_invoked(&mut self) -> Result<(), ArtifactError> {
        validate_transition(self.state, ReconcileState::Invoked)?;
        self.state = ReconcileState::Invoked;
        Ok(())
    }

    /// Locate the produced artifact, then restore the backup. Runs
    /// regardless of how the invocation went, and always converges to
    /// `Restored` before `End`.
    pub fn finish(mut self) -> Result<ReconcileOutcome, ArtifactError> {
        validate_transition(self.state, ReconcileState::Located)?;
        let artifact_path = self.locate();
        self.state = ReconcileState::Located;

        validate_transition(self.state, ReconcileState::Restored)?;
        let backup_restored_to = self.restore();
        self.state = ReconcileState::Restored;

        validate_transition(self.state, ReconcileState::End)?;
        self.state = ReconcileState::End;

        Ok(ReconcileOutcome {
            artifact_path,
            backup_restored_to,
            notes: self.notes,
        })
    }

    fn locate(&mut self) -> Option<PathBuf> {
        if self.inner.exists() {
            // The tool dropped the artifact inside the project tree; move it
            // to the canonical sibling path, or report it where it is rather
            // than lose it.
            match fs::rename(&self.inner, &self.canonical) {
                Ok(()) => {
                    debug!(
                        "moved artifact {} -> {}",
                        self.inner.display(),
                        self.canonical.display()
                    );
                    Some(self.canonical.clone())
                }
                Err(e) => {
                    warn!(
                        "could not move artifact to {}: {e}",
                        self.canonical.display()
                    );
                    self.notes.push(format!(
                        "artifact left inside the project directory at {}: {e}",
                        self.inner.display()
                    ));
                    Some(self.inner.clone())
                }
            }
        } else if self.canonical.exists() {
            Some(self.canonical.clone())
        } else {
            None
        }
    }

    fn restore(&mut self) -> Option<PathBuf> {
        let backup = self.backup.take()?;

        let target = if self.canonical.exists() {
            // The new artifact occupies the canonical slot; restore the
            // original under a disambiguated sibling name.
            disambiguated_path(&self.canonical)
        } else {
            self.canonical.clone()
        };

        match fs::rename(&backup, &target) {
            Ok(()) => {
                debug!("restored backup to {}", target.display());
                Some(target)
            }
            Err(e) => {
                warn!("could not restore backup {}: {e}", backup.display());
                self.notes.push(format!(
                    "original artifact remains at {}: {e}",
                    backup.display()
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(dir: &Path) -> PathBuf {
        let p = dir.join("book");
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn run_cycle(rec: &mut Option<Reconciler>) -> ReconcileOutcome {
        let mut r = rec.take().unwrap();
        r.protect().unwrap();
        r.mark_invoked().unwrap();
        r.finish().unwrap()
    }

    #[test]
    fn valid_transitions() {
        use ReconcileState::{End, Invoked, Located, Protected, Restored, Start};
        assert!(validate_transition(Start, Protected).is_ok());
        assert!(validate_transition(Protected, Invoked).is_ok());
        assert!(validate_transition(Invoked, Located).is_ok());
        assert!(validate_transition(Located, Restored).is_ok());
        assert!(validate_transition(Restored, End).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        use ReconcileState::{End, Invoked, Located, Protected, Restored, Start};
        assert!(validate_transition(Start, Invoked).is_err());
        assert!(validate_transition(Protected, Located).is_err());
        assert!(validate_transition(Invoked, End).is_err());
        assert!(validate_transition(End, Start).is_err());
        assert!(validate_transition(Restored, Restored).is_err());
    }

    #[test]
    fn steps_out_of_order_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Reconciler::new(&project(dir.path())).unwrap();
        assert!(rec.mark_invoked().is_err());
        rec.protect().unwrap();
        assert!(rec.protect().is_err());
    }

    #[test]
    fn no_artifact_no_backup_yields_empty_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Some(Reconciler::new(&project(dir.path())).unwrap());
        let outcome = run_cycle(&mut rec);
        assert_eq!(outcome.artifact_path, None);
        assert_eq!(outcome.backup_restored_to, None);
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn new_artifact_at_canonical_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");

        let mut rec = Reconciler::new(&proj).unwrap();
        rec.protect().unwrap();
        fs::write(&canonical, b"NEW").unwrap();
        rec.mark_invoked().unwrap();
        let outcome = rec.finish().unwrap();

        assert_eq!(outcome.artifact_path.as_deref(), Some(canonical.as_path()));
    }

    #[test]
    fn inner_artifact_is_moved_to_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");

        let mut rec = Reconciler::new(&proj).unwrap();
        rec.protect().unwrap();
        fs::write(proj.join("book.epub"), b"NEW").unwrap();
        rec.mark_invoked().unwrap();
        let outcome = rec.finish().unwrap();

        assert_eq!(outcome.artifact_path.as_deref(), Some(canonical.as_path()));
        assert!(canonical.exists());
        assert!(!proj.join("book.epub").exists());
    }

    #[test]
    fn existing_artifact_survives_when_nothing_is_produced() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");
        fs::write(&canonical, b"ORIGINAL").unwrap();

        let mut rec = Some(Reconciler::new(&proj).unwrap());
        let outcome = run_cycle(&mut rec);

        // No artifact produced: original is back at the canonical path.
        assert_eq!(outcome.artifact_path, None);
        assert_eq!(outcome.backup_restored_to.as_deref(), Some(canonical.as_path()));
        assert_eq!(fs::read(&canonical).unwrap(), b"ORIGINAL");
        // No backup remnants.
        let hidden: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(hidden.is_empty(), "unexpected remnants: {hidden:?}");
    }

    #[test]
    fn original_is_disambiguated_when_new_artifact_takes_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");
        fs::write(&canonical, b"ORIGINAL").unwrap();

        let mut rec = Reconciler::new(&proj).unwrap();
        rec.protect().unwrap();
        fs::write(proj.join("book.epub"), b"NEW").unwrap();
        rec.mark_invoked().unwrap();
        let outcome = rec.finish().unwrap();

        assert_eq!(outcome.artifact_path.as_deref(), Some(canonical.as_path()));
        assert_eq!(fs::read(&canonical).unwrap(), b"NEW");
        let restored = dir.path().join("book (2).epub");
        assert_eq!(outcome.backup_restored_to.as_deref(), Some(restored.as_path()));
        assert_eq!(fs::read(&restored).unwrap(), b"ORIGINAL");
    }

    #[test]
    fn repeated_runs_never_overwrite_restored_originals() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");

        for round in 0u8..3 {
            fs::write(&canonical, format!("GEN-{round}")).unwrap();
            let mut rec = Reconciler::new(&proj).unwrap();
            rec.protect().unwrap();
            fs::write(proj.join("book.epub"), format!("GEN-{}", round + 1)).unwrap();
            rec.mark_invoked().unwrap();
            rec.finish().unwrap();
        }

        assert!(dir.path().join("book (2).epub").exists());
        assert!(dir.path().join("book (3).epub").exists());
        assert!(dir.path().join("book (4).epub").exists());
    }

    #[test]
    fn stale_backup_from_crashed_run_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let proj = project(dir.path());
        let canonical = dir.path().join("book.epub");
        fs::write(&canonical, b"ORIGINAL").unwrap();

        let mut rec = Reconciler::new(&proj).unwrap();
        rec.protect().unwrap();
        // Simulate a crash: drop without finishing. The backup stays on
        // disk under its hidden name.
        let hidden: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".book-"))
            .collect();
        assert_eq!(hidden.len(), 1);
        drop(rec);

        // A later run must not clobber the stale backup.
        fs::write(&canonical, b"SECOND").unwrap();
        let mut rec = Some(Reconciler::new(&proj).unwrap());
        run_cycle(&mut rec);
        assert!(hidden[0].path().exists());
    }
}
