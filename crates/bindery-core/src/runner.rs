use crate::outcome::RunOutcome;
use crate::CoreError;
use bindery_artifact::{ReconcileOutcome, Reconciler};
use bindery_process::{invoke, InvokeOutcome, InvokeResult, ProcessError};
use bindery_schema::{parse_report_file, ToolConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Drives the external checker against one project directory at a time.
///
/// Each run is a fresh, independent child process; the runner holds no state
/// across calls beyond its configuration and the directory it allocates temp
/// result files in.
pub struct Runner {
    tool: ToolConfig,
    result_dir: PathBuf,
}

impl Runner {
    pub fn new(tool: ToolConfig) -> Self {
        Self {
            tool,
            result_dir: std::env::temp_dir(),
        }
    }

    /// Redirect temp result files, mainly for tests.
    pub fn with_result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = dir.into();
        self
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Validate `project_dir`, optionally packaging an artifact, and parse
    /// the checker's structured result.
    pub fn run(&self, project_dir: &Path, produce_artifact: bool) -> Result<RunOutcome, CoreError> {
        info!("checking {}", project_dir.display());
        let result_file = self.alloc_result_path();

        // Inner closure so the temp result file is removed on every exit
        // path, including early classification returns.
        let outcome = self.run_inner(project_dir, produce_artifact, &result_file);
        let _ = fs::remove_file(&result_file);
        outcome
    }

    fn run_inner(
        &self,
        project_dir: &Path,
        produce_artifact: bool,
        result_file: &Path,
    ) -> Result<RunOutcome, CoreError> {
        let mut args = self.base_args(project_dir);
        args.push("--json".to_owned());
        args.push(result_file.to_string_lossy().into_owned());
        if produce_artifact {
            args.push("--save".to_owned());
        }

        let mut reconciler = if produce_artifact {
            let mut r = Reconciler::new(project_dir)?;
            r.protect()?;
            Some(r)
        } else {
            None
        };

        let invoked = invoke(
            &self.tool.launcher,
            &args,
            Duration::from_secs(self.tool.timeout_secs),
        );

        // Reconciliation runs regardless of how the invocation went; a
        // created backup is always restored before we classify.
        let reconciled = match reconciler.take() {
            Some(mut r) => {
                r.mark_invoked()?;
                Some(r.finish()?)
            }
            None => None,
        };

        Ok(self.classify(invoked, reconciled, Some(result_file)))
    }

    /// Package the artifact only, without a structured result file. The
    /// tool's exit code is the sole success signal in this mode: 0 = clean,
    /// 1 = validation errors aborted generation, anything else = execution
    /// failure.
    pub fn package(&self, project_dir: &Path) -> Result<RunOutcome, CoreError> {
        info!("packaging {}", project_dir.display());
        let mut args = self.base_args(project_dir);
        args.push("--save".to_owned());

        let mut reconciler = Reconciler::new(project_dir)?;
        reconciler.protect()?;

        let invoked = invoke(
            &self.tool.launcher,
            &args,
            Duration::from_secs(self.tool.timeout_secs),
        );

        reconciler.mark_invoked()?;
        let reconciled = reconciler.finish()?;

        Ok(self.classify(invoked, Some(reconciled), None))
    }

    fn base_args(&self, project_dir: &Path) -> Vec<String> {
        vec![
            "-jar".to_owned(),
            self.tool.jar.to_string_lossy().into_owned(),
            "-mode".to_owned(),
            "exp".to_owned(),
            project_dir.to_string_lossy().into_owned(),
        ]
    }

    /// Process-unique, time-seeded result path so concurrent runs against
    /// different directories cannot collide.
    fn alloc_result_path(&self) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_micros();
        self.result_dir
            .join(format!("bindery-result-{}-{stamp}.json", std::process::id()))
    }

    fn classify(
        &self,
        invoked: Result<InvokeResult, ProcessError>,
        reconciled: Option<ReconcileOutcome>,
        result_file: Option<&Path>,
    ) -> RunOutcome {
        let artifact_path = reconciled.and_then(|r| r.artifact_path);

        let result = match invoked {
            Ok(r) => r,
            Err(ProcessError::NotFound(_)) => {
                return RunOutcome::ToolNotFound {
                    launcher: self.tool.launcher.clone(),
                }
            }
            Err(e) => {
                return RunOutcome::ExecutionFailure {
                    error: format!("failed to run checker: {e}"),
                }
            }
        };

        let code = match result.outcome {
            // A null exit signal is indistinguishable from our own kill;
            // both mean the bounded run did not complete.
            InvokeOutcome::TimedOut | InvokeOutcome::Signaled => {
                return RunOutcome::Timeout {
                    seconds: self.tool.timeout_secs,
                }
            }
            InvokeOutcome::Exited(code) => code,
        };

        match result_file {
            Some(path) => match parse_report_file(path) {
                Ok(report) => {
                    debug!(
                        "parsed result: {} message(s), worst {:?}",
                        report.messages.len(),
                        report.worst_severity()
                    );
                    if report.has_blocking() {
                        RunOutcome::ValidationFailed {
                            report: Some(report),
                            artifact_path,
                        }
                    } else {
                        RunOutcome::Success {
                            report: Some(report),
                            artifact_path,
                        }
                    }
                }
                Err(e) => RunOutcome::ExecutionFailure {
                    error: execution_error(code, &result.stderr, &e.to_string()),
                },
            },
            // Artifact-only mode: exit code is the whole story.
            None => match code {
                0 => RunOutcome::Success {
                    report: None,
                    artifact_path,
                },
                1 => RunOutcome::ValidationFailed {
                    report: None,
                    artifact_path,
                },
                other => RunOutcome::ExecutionFailure {
                    error: execution_error(other, &result.stderr, "unexpected exit code"),
                },
            },
        }
    }
}

fn execution_error(code: i32, stderr: &str, detail: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("checker execution failed (exit code {code}): {detail}")
    } else {
        format!("checker execution failed (exit code {code}): {detail}; stderr: {stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(launcher: &Path) -> ToolConfig {
        ToolConfig {
            launcher: launcher.to_path_buf(),
            jar: PathBuf::from("/opt/epubcheck/epubcheck.jar"),
            timeout_secs: 5,
        }
    }

    #[test]
    fn result_paths_are_unique_per_call() {
        let runner = Runner::new(tool(Path::new("java")));
        let a = runner.alloc_result_path();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = runner.alloc_result_path();
        assert_ne!(a, b);
    }

    #[test]
    fn base_args_follow_tool_contract() {
        let runner = Runner::new(tool(Path::new("java")));
        let args = runner.base_args(Path::new("/work/book"));
        assert_eq!(
            args,
            vec![
                "-jar",
                "/opt/epubcheck/epubcheck.jar",
                "-mode",
                "exp",
                "/work/book"
            ]
        );
    }

    #[test]
    fn missing_launcher_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("book");
        std::fs::create_dir_all(&proj).unwrap();

        let runner = Runner::new(tool(Path::new("/nonexistent/jvm/java")))
            .with_result_dir(dir.path());
        let outcome = runner.run(&proj, false).unwrap();
        assert!(matches!(outcome, RunOutcome::ToolNotFound { .. }));
    }

    #[test]
    fn execution_error_includes_stderr_and_code() {
        let text = execution_error(137, " oom \n", "no result file");
        assert!(text.contains("137"));
        assert!(text.contains("oom"));
        assert!(text.contains("no result file"));
    }

    #[test]
    fn execution_error_without_stderr() {
        let text = execution_error(2, "", "bad flags");
        assert!(text.contains("exit code 2"));
        assert!(!text.contains("stderr"));
    }
}
