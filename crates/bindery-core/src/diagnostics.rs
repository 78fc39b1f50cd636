use bindery_schema::{CheckReport, Severity};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Editor-agnostic severity level of a mapped diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Information,
    Hint,
}

impl DiagnosticLevel {
    /// Fixed severity table. Anything unrecognized maps to `Error`: fail
    /// toward visibility, not silence.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Fatal | Severity::Error | Severity::Unknown => Self::Error,
            Severity::Warning => Self::Warning,
            Severity::Usage => Self::Information,
            Severity::Info => Self::Hint,
        }
    }
}

/// 0-based position in a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Half-open range `[start, end)`. Always non-empty after mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One location-anchored diagnostic derived from a checker message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub range: Range,
    pub message: String,
    pub level: DiagnosticLevel,
    pub code: String,
}

/// Per-pass cache of file contents split into lines. Each distinct file is
/// read at most once per mapping pass; an unreadable file degrades to the
/// narrow single-character range, never an error.
#[derive(Debug, Default)]
pub struct FileLineCache {
    files: HashMap<PathBuf, Option<Vec<String>>>,
}

impl FileLineCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines(&mut self, path: &Path) -> Option<&[String]> {
        self.files
            .entry(path.to_path_buf())
            .or_insert_with(|| match fs::read_to_string(path) {
                Ok(content) => Some(content.lines().map(String::from).collect()),
                Err(e) => {
                    debug!("cannot read {} for range widening: {e}", path.display());
                    None
                }
            })
            .as_deref()
    }
}

/// Map one parsed report onto absolute-file diagnostics. Messages without
/// locations produce no diagnostic here; the textual report path surfaces
/// them instead.
pub fn map_report(
    report: &CheckReport,
    project_dir: &Path,
    cache: &mut FileLineCache,
) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
    let mut out: BTreeMap<PathBuf, Vec<Diagnostic>> = BTreeMap::new();

    for message in &report.messages {
        for location in &message.locations {
            let file = project_dir.join(&location.path);
            let range = widen_range(location.line, location.column, &file, cache);
            let text = match &message.suggestion {
                Some(s) => format!("{} (suggestion: {s})", message.message),
                None => message.message.clone(),
            };
            out.entry(file.clone()).or_default().push(Diagnostic {
                file,
                range,
                message: text,
                level: DiagnosticLevel::from_severity(message.severity),
                code: message.id.clone(),
            });
        }
    }

    out
}

/// Map a whole batch of reports with a single file-content cache pass.
pub fn map_batch(batch: &[(&CheckReport, &Path)]) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
    let mut cache = FileLineCache::new();
    let mut out: BTreeMap<PathBuf, Vec<Diagnostic>> = BTreeMap::new();
    for (report, project_dir) in batch {
        for (file, diags) in map_report(report, project_dir, &mut cache) {
            out.entry(file).or_default().extend(diags);
        }
    }
    out
}

/// Convert the checker's 1-based line/column into a 0-based half-open range,
/// widened to the end of the line when the file content is known.
fn widen_range(line: i64, column: i64, file: &Path, cache: &mut FileLineCache) -> Range {
    let start_line = u32::try_from(line - 1).unwrap_or(0);
    let start_col = u32::try_from(column - 1).unwrap_or(0);

    let line_len = cache
        .lines(file)
        .and_then(|lines| lines.get(start_line as usize))
        .map(|l| l.chars().count() as u32);

    let mut end_col = line_len.unwrap_or(start_col + 1);
    if end_col <= start_col {
        end_col = start_col + 1;
    }

    Range {
        start: Position {
            line: start_line,
            column: start_col,
        },
        end: Position {
            line: start_line,
            column: end_col,
        },
    }
}
