use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read result file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse result file: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// Message severity as reported by the external checker.
///
/// Variants are declared in ascending order so the derived `Ord` ranks
/// `Fatal` highest: FATAL > ERROR > WARNING > USAGE > INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Severity {
    Info,
    Usage,
    Warning,
    Error,
    Fatal,
    /// Any severity string the checker emits that this version does not know.
    Unknown,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "INFO" => Self::Info,
            "USAGE" => Self::Usage,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Usage => "USAGE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl Severity {
    /// Whether a message at this severity fails a validation run.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Fatal | Self::Error)
    }
}

/// Identity of the checker that produced a report.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Checker {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "checkerVersion")]
    pub checker_version: Option<String>,
}

/// Publication metadata the checker extracted from the package document.
///
/// The checker emits more fields than these; unknown fields are ignored
/// since this is another tool's output, not ours.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Publication {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// A source location attached to a checker message. Line and column are
/// 1-based; the checker uses -1 when a position is unknown.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub line: i64,
    pub column: i64,
    #[serde(default)]
    pub context: Option<String>,
}

/// One diagnostic message from the checker, possibly anchored at several
/// source locations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// The checker's full structured result, read from the temp result file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    pub checker: Checker,
    #[serde(default)]
    pub publication: Option<Publication>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl CheckReport {
    /// Highest severity present in the report, or `None` when it is empty.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.messages.iter().map(|m| m.severity).max()
    }

    /// A run succeeds when no FATAL or ERROR message is present.
    pub fn has_blocking(&self) -> bool {
        self.messages.iter().any(|m| m.severity.is_blocking())
    }

    /// Number of messages at exactly the given severity.
    pub fn count_at(&self, severity: Severity) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == severity)
            .count()
    }
}

pub fn parse_report_str(input: &str) -> Result<CheckReport, ReportError> {
    Ok(serde_json::from_str(input)?)
}

pub fn parse_report_file(path: impl AsRef<Path>) -> Result<CheckReport, ReportError> {
    let content = fs::read_to_string(path)?;
    parse_report_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = r#"{
        "checker": {
            "name": "epubcheck",
            "version": "5.1.0",
            "checkerVersion": "5.1.0"
        },
        "publication": {
            "title": "Moby-Dick",
            "publisher": "Harper & Brothers",
            "language": "en-US",
            "identifier": "urn:isbn:9780000000001"
        },
        "messages": [
            {
                "ID": "OPF-004",
                "severity": "ERROR",
                "message": "Invalid prefix declaration",
                "suggestion": "Remove the prefix or declare it",
                "locations": [
                    {"path": "OEBPS/content.opf", "line": 2, "column": 14, "context": "prefix=\"foaf:\""}
                ]
            },
            {
                "ID": "ACC-001",
                "severity": "USAGE",
                "message": "Content is not within the page margins",
                "locations": []
            }
        ]
    }"#;

    #[test]
    fn parses_full_report() {
        let report = parse_report_str(FULL_REPORT).unwrap();
        assert_eq!(report.checker.name, "epubcheck");
        assert_eq!(report.checker.version.as_deref(), Some("5.1.0"));
        assert_eq!(
            report.publication.as_ref().unwrap().title.as_deref(),
            Some("Moby-Dick")
        );
        assert_eq!(report.messages.len(), 2);

        let first = &report.messages[0];
        assert_eq!(first.id, "OPF-004");
        assert_eq!(first.severity, Severity::Error);
        assert_eq!(first.locations.len(), 1);
        assert_eq!(first.locations[0].line, 2);
        assert_eq!(first.locations[0].column, 14);
    }

    #[test]
    fn parses_minimal_report() {
        let report = parse_report_str(r#"{"checker": {"name": "epubcheck"}}"#).unwrap();
        assert!(report.publication.is_none());
        assert!(report.messages.is_empty());
        assert!(!report.has_blocking());
        assert_eq!(report.worst_severity(), None);
    }

    #[test]
    fn ignores_extra_fields_from_newer_checkers() {
        let input = r#"{
            "checker": {"name": "epubcheck", "nError": 0, "elapsedTime": 812},
            "items": [{"id": "item-1"}],
            "messages": []
        }"#;
        let report = parse_report_str(input).unwrap();
        assert_eq!(report.checker.name, "epubcheck");
    }

    #[test]
    fn malformed_report_fails() {
        assert!(parse_report_str("not json").is_err());
        assert!(parse_report_str(r#"{"messages": []}"#).is_err());
    }

    #[test]
    fn parse_report_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(&path, FULL_REPORT).unwrap();
        let report = parse_report_file(&path).unwrap();
        assert_eq!(report.messages.len(), 2);
    }

    #[test]
    fn severity_ordering_fatal_highest() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Usage);
        assert!(Severity::Usage > Severity::Info);
    }

    #[test]
    fn severity_blocking_classification() {
        assert!(Severity::Fatal.is_blocking());
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
        assert!(!Severity::Usage.is_blocking());
        assert!(!Severity::Info.is_blocking());
    }

    #[test]
    fn unknown_severity_parses_without_error() {
        let input = r#"{
            "checker": {"name": "epubcheck"},
            "messages": [
                {"ID": "X-001", "severity": "SUPPRESSED", "message": "odd", "locations": []}
            ]
        }"#;
        let report = parse_report_str(input).unwrap();
        assert_eq!(report.messages[0].severity, Severity::Unknown);
    }

    #[test]
    fn worst_severity_and_counts() {
        let report = parse_report_str(FULL_REPORT).unwrap();
        assert_eq!(report.worst_severity(), Some(Severity::Error));
        assert!(report.has_blocking());
        assert_eq!(report.count_at(Severity::Error), 1);
        assert_eq!(report.count_at(Severity::Usage), 1);
        assert_eq!(report.count_at(Severity::Fatal), 0);
    }
}
