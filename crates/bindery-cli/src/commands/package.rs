use super::{
    ensure_project_dir, json_pretty, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS,
    EXIT_TOOL_ERROR,
};
use bindery_core::{RunOutcome, Runner};
use bindery_schema::ToolConfig;
use std::path::Path;

pub fn run(tool: ToolConfig, dir: &Path, json: bool) -> Result<u8, String> {
    ensure_project_dir(dir)?;
    let runner = Runner::new(tool);

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("packaging {}...", dir.display())))
    };

    let outcome = runner.package(dir).map_err(|e| e.to_string())?;

    let code = match &outcome {
        RunOutcome::Success { .. } => EXIT_SUCCESS,
        RunOutcome::ValidationFailed { .. } => EXIT_FAILURE,
        RunOutcome::ExecutionFailure { .. }
        | RunOutcome::Timeout { .. }
        | RunOutcome::ToolNotFound { .. } => EXIT_TOOL_ERROR,
    };

    if let Some(ref pb) = pb {
        match (outcome.artifact_path(), outcome.error_text()) {
            (Some(path), None) => spin_ok(pb, &format!("packaged {}", path.display())),
            (_, Some(error)) => spin_fail(pb, &error),
            (None, None) => spin_fail(pb, "no artifact produced"),
        }
    }

    if json {
        println!("{}", json_pretty(&outcome.into_report(dir))?);
    }

    Ok(code)
}
