use super::{
    colorize_level, ensure_project_dir, json_pretty, parse_fail_on, spin_fail, spin_ok, spinner,
    EXIT_FAILURE, EXIT_SUCCESS, EXIT_TOOL_ERROR,
};
use bindery_core::{map_batch, RunOutcome, Runner};
use bindery_schema::{CheckReport, Severity, ToolConfig};
use std::path::{Path, PathBuf};

pub fn run(
    tool: ToolConfig,
    dirs: &[PathBuf],
    fail_on: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let threshold = fail_on.map(parse_fail_on).transpose()?;
    let runner = Runner::new(tool);

    let mut reports = Vec::new();
    let mut tool_error = false;

    // Strictly one project at a time; each run is an independent process.
    for dir in dirs {
        ensure_project_dir(dir)?;

        let pb = if json {
            None
        } else {
            Some(spinner(&format!("checking {}...", dir.display())))
        };

        let outcome = runner.run(dir, false).map_err(|e| e.to_string())?;
        if matches!(
            outcome,
            RunOutcome::ToolNotFound { .. }
                | RunOutcome::Timeout { .. }
                | RunOutcome::ExecutionFailure { .. }
        ) {
            tool_error = true;
        }

        if let Some(ref pb) = pb {
            match outcome.error_text() {
                None => spin_ok(pb, &format!("{}: no blocking messages", dir.display())),
                Some(error) => spin_fail(pb, &format!("{}: {error}", dir.display())),
            }
        }

        reports.push(outcome.into_report(dir));
    }

    // One mapping pass per batch: every distinct file is read once.
    let batch: Vec<(&CheckReport, &Path)> = reports
        .iter()
        .filter_map(|r| r.report.as_ref().map(|rep| (rep, r.project_dir.as_path())))
        .collect();
    let diagnostics = map_batch(&batch);

    if json {
        let payload = serde_json::json!({
            "results": reports,
            "diagnostics": diagnostics,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for (file, diags) in &diagnostics {
            println!("{}:", file.display());
            for d in diags {
                println!(
                    "  {}:{} {} {}: {}",
                    d.range.start.line + 1,
                    d.range.start.column + 1,
                    colorize_level(d.level),
                    d.code,
                    d.message
                );
            }
        }

        let passed = reports.iter().filter(|r| r.success).count();
        println!(
            "checked {} project(s): {passed} passed, {} failed",
            reports.len(),
            reports.len() - passed
        );
    }

    let threshold_hit = threshold.is_some_and(|t| reports.iter().any(|r| at_or_above(r.report.as_ref(), t)));
    let any_failed = reports.iter().any(|r| !r.success);

    if tool_error {
        Ok(EXIT_TOOL_ERROR)
    } else if any_failed || threshold_hit {
        Ok(EXIT_FAILURE)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn at_or_above(report: Option<&CheckReport>, threshold: Severity) -> bool {
    report.is_some_and(|r| r.messages.iter().any(|m| m.severity >= threshold))
}
