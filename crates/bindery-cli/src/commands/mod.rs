pub mod check;
pub mod completions;
pub mod doctor;
pub mod expand;
pub mod man_pages;
pub mod package;

use bindery_core::DiagnosticLevel;
use bindery_schema::Severity;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_TOOL_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_level(level: DiagnosticLevel) -> String {
    use console::Style;
    match level {
        DiagnosticLevel::Error => Style::new().red().bold().apply_to("error").to_string(),
        DiagnosticLevel::Warning => Style::new().yellow().apply_to("warning").to_string(),
        DiagnosticLevel::Information => Style::new().cyan().apply_to("info").to_string(),
        DiagnosticLevel::Hint => Style::new().dim().apply_to("hint").to_string(),
    }
}

/// CLI-side sanity check that a directory looks like an expanded EPUB.
/// The library crates never inspect project contents.
pub fn ensure_project_dir(dir: &Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err(format!("not a directory: {}", dir.display()));
    }
    if dir.join("mimetype").exists() || dir.join("META-INF").join("container.xml").exists() {
        Ok(())
    } else {
        Err(format!(
            "not an expanded EPUB (no mimetype or META-INF/container.xml): {}",
            dir.display()
        ))
    }
}

/// Parse a `--fail-on` severity name.
pub fn parse_fail_on(input: &str) -> Result<Severity, String> {
    let severity = Severity::from(input.to_owned());
    if severity == Severity::Unknown {
        Err(format!(
            "unknown severity '{input}' (expected fatal, error, warning, usage, or info)"
        ))
    } else {
        Ok(severity)
    }
}
