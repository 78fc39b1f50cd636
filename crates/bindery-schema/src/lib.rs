//! Result schema parsing, severity model, and tool configuration for Bindery.
//!
//! This crate defines the schema layer: the external checker's structured JSON
//! result (`CheckReport`), the ordered severity model (`Severity`), and the
//! TOML tool configuration (`Config`) that points Bindery at the launcher and
//! checker jar.

pub mod config;
pub mod report;

pub use config::{load_config, parse_config_str, Config, ConfigError, ToolConfig, ToolSection};
pub use report::{
    parse_report_file, parse_report_str, CheckReport, Checker, Location, Message, Publication,
    ReportError, Severity,
};
