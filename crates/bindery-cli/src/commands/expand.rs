use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use bindery_process::{invoke, InvokeOutcome, ProcessError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Expand a packaged artifact by shelling out to the platform archive
/// utility. Cross-platform extraction beyond that is deliberately not
/// attempted.
pub fn run(
    file: &Path,
    out: Option<&Path>,
    timeout_secs: u64,
    json: bool,
) -> Result<u8, String> {
    if !file.is_file() {
        return Err(format!("no such artifact: {}", file.display()));
    }

    let target = match out {
        Some(dir) => dir.to_path_buf(),
        None => default_target(file)?,
    };
    if target.exists() {
        return Err(format!(
            "destination already exists: {}",
            target.display()
        ));
    }

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("expanding {}...", file.display())))
    };

    let args = vec![
        "-q".to_owned(),
        file.to_string_lossy().into_owned(),
        "-d".to_owned(),
        target.to_string_lossy().into_owned(),
    ];
    let result = invoke(
        Path::new("unzip"),
        &args,
        Duration::from_secs(timeout_secs),
    );

    let outcome = match result {
        Ok(r) => r,
        Err(ProcessError::NotFound(_)) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "unzip not found");
            }
            return Err("checker error: unzip not found; install your platform's archive utility".to_owned());
        }
        Err(e) => return Err(format!("checker error: {e}")),
    };

    match outcome.outcome {
        InvokeOutcome::Exited(0) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("expanded to {}", target.display()));
            }
            if json {
                let payload = serde_json::json!({
                    "artifact": file,
                    "expanded_to": target,
                });
                println!("{}", json_pretty(&payload)?);
            }
            Ok(EXIT_SUCCESS)
        }
        InvokeOutcome::Exited(code) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "expansion failed");
            }
            let stderr = outcome.stderr.trim();
            Err(format!(
                "checker error: unzip exited with code {code}{}",
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!(": {stderr}")
                }
            ))
        }
        InvokeOutcome::TimedOut | InvokeOutcome::Signaled => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "expansion timed out");
            }
            Err(format!(
                "checker error: unzip did not finish within {timeout_secs} seconds"
            ))
        }
    }
}

/// Sibling directory named after the artifact: `/work/book.epub` expands to
/// `/work/book`.
fn default_target(file: &Path) -> Result<PathBuf, String> {
    let stem = file
        .file_stem()
        .ok_or_else(|| format!("cannot derive a directory name from {}", file.display()))?;
    Ok(file.with_file_name(stem))
}
