use bindery_schema::CheckReport;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Classified result of one checker invocation. Produced exactly once per
/// run; owned by the caller after return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The checker ran and reported no FATAL or ERROR message.
    Success {
        /// Parsed structured result. Absent in artifact-only mode, where the
        /// exit code is the sole signal.
        report: Option<CheckReport>,
        artifact_path: Option<PathBuf>,
    },
    /// The checker ran cleanly but the publication has blocking messages.
    /// A normal validation outcome, not an execution error.
    ValidationFailed {
        report: Option<CheckReport>,
        artifact_path: Option<PathBuf>,
    },
    /// The checker misbehaved: unexpected exit, unreadable or malformed
    /// result file. Carries stderr and exit code for diagnosis.
    ExecutionFailure { error: String },
    /// The checker exceeded the configured wall-clock limit.
    Timeout { seconds: u64 },
    /// The launcher executable could not be started at all.
    ToolNotFound { launcher: PathBuf },
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn report(&self) -> Option<&CheckReport> {
        match self {
            Self::Success { report, .. } | Self::ValidationFailed { report, .. } => {
                report.as_ref()
            }
            _ => None,
        }
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        match self {
            Self::Success { artifact_path, .. } | Self::ValidationFailed { artifact_path, .. } => {
                artifact_path.as_deref()
            }
            _ => None,
        }
    }

    /// Actionable human-readable description of a non-success outcome.
    pub fn error_text(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::ValidationFailed { report, .. } => Some(match report {
                Some(r) => {
                    let fatals = r.count_at(bindery_schema::Severity::Fatal);
                    let errors = r.count_at(bindery_schema::Severity::Error);
                    format!("validation failed: {fatals} fatal, {errors} error message(s)")
                }
                None => {
                    "validation errors reported; artifact generation aborted (exit code 1)"
                        .to_owned()
                }
            }),
            Self::ExecutionFailure { error } => Some(error.clone()),
            Self::Timeout { seconds } => Some(format!(
                "checker timed out after {seconds} seconds; raise tool.timeout_secs to allow more"
            )),
            Self::ToolNotFound { launcher } => Some(format!(
                "checker launcher not found at '{}'; install a JVM or set tool.launcher",
                launcher.display()
            )),
        }
    }

    /// Flatten into the caller-facing report shape.
    pub fn into_report(self, project_dir: &Path) -> RunReport {
        let success = self.success();
        let error = self.error_text();
        let (report, artifact_path) = match self {
            Self::Success {
                report,
                artifact_path,
            }
            | Self::ValidationFailed {
                report,
                artifact_path,
            } => (report, artifact_path),
            _ => (None, None),
        };
        RunReport {
            success,
            project_dir: project_dir.to_path_buf(),
            report,
            error,
            artifact_path,
        }
    }
}

/// The sole result surface handed to external collaborators (CLI output,
/// batch summaries).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub success: bool,
    pub project_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CheckReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
}
