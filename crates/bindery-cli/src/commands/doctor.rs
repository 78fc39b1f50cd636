use super::{EXIT_FAILURE, EXIT_SUCCESS};
use bindery_process::{invoke, InvokeOutcome, ProcessError};
use bindery_schema::Config;
use std::path::Path;
use std::time::Duration;

pub fn run(
    config: &Config,
    jar_override: Option<&Path>,
    timeout_override: Option<u64>,
    json_output: bool,
) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_launcher(config, &mut checks, &mut all_pass);
    check_jar(config, jar_override, &mut checks, &mut all_pass);
    check_timeout(config, timeout_override, &mut checks);
    check_temp_dir(&mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_launcher(config: &Config, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let launcher = Path::new(&config.tool.launcher);
    match invoke(
        launcher,
        &["-version".to_owned()],
        Duration::from_secs(10),
    ) {
        Ok(result) if matches!(result.outcome, InvokeOutcome::Exited(0)) => {
            // JVMs print their version banner on stderr.
            let banner = result.stderr.lines().next().unwrap_or("").trim().to_owned();
            checks.push(Check::pass(
                "launcher",
                &format!("Launcher '{}' works ({banner})", launcher.display()),
            ));
        }
        Ok(_) => {
            *all_pass = false;
            checks.push(Check::fail(
                "launcher",
                &format!(
                    "Launcher '{}' did not report a version; check tool.launcher",
                    launcher.display()
                ),
            ));
        }
        Err(ProcessError::NotFound(_)) => {
            *all_pass = false;
            checks.push(Check::fail(
                "launcher",
                &format!(
                    "Launcher '{}' not found; install a JVM or set tool.launcher",
                    launcher.display()
                ),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "launcher",
                &format!("Cannot run launcher '{}': {e}", launcher.display()),
            ));
        }
    }
}

fn check_jar(
    config: &Config,
    jar_override: Option<&Path>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let jar = jar_override.map(Path::to_path_buf).or_else(|| config.tool.jar.clone());
    match jar {
        Some(path) if path.is_file() => {
            checks.push(Check::pass(
                "checker_jar",
                &format!("Checker jar found at {}", path.display()),
            ));
        }
        Some(path) => {
            *all_pass = false;
            checks.push(Check::fail(
                "checker_jar",
                &format!("Checker jar not found at {}", path.display()),
            ));
        }
        None => {
            *all_pass = false;
            checks.push(Check::fail(
                "checker_jar",
                "No checker jar configured; set tool.jar in bindery.toml or pass --jar",
            ));
        }
    }
}

fn check_timeout(config: &Config, timeout_override: Option<u64>, checks: &mut Vec<Check>) {
    let timeout = timeout_override.unwrap_or(config.tool.timeout_secs);
    if timeout == 0 {
        checks.push(Check::fail(
            "timeout",
            "tool.timeout_secs is 0; every run would be killed immediately",
        ));
    } else if timeout < 10 {
        checks.push(Check::warn(
            "timeout",
            &format!("tool.timeout_secs is {timeout}; large publications may not finish"),
        ));
    } else {
        checks.push(Check::pass(
            "timeout",
            &format!("Run limit is {timeout} seconds"),
        ));
    }
}

fn check_temp_dir(checks: &mut Vec<Check>, all_pass: &mut bool) {
    let dir = std::env::temp_dir();
    let probe = dir.join(format!("bindery-doctor-{}", std::process::id()));
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            checks.push(Check::pass(
                "temp_dir",
                &format!("Temp directory {} is writable", dir.display()),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "temp_dir",
                &format!("Temp directory {} is not writable: {e}", dir.display()),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Bindery Doctor\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "pass".to_owned(),
            message: message.to_owned(),
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "fail".to_owned(),
            message: message.to_owned(),
        }
    }

    fn warn(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "warn".to_owned(),
            message: message.to_owned(),
        }
    }
}
