use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "bindery.toml";
pub const CONFIG_ENV_VAR: &str = "BINDERY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("no checker jar configured: set tool.jar in {DEFAULT_CONFIG_FILE} or pass --jar")]
    MissingJar,
    #[error("tool.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// On-disk configuration (`bindery.toml`).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolSection {
    /// Launcher executable used to start the checker (a JVM).
    #[serde(default = "default_launcher")]
    pub launcher: String,
    /// Path to the checker jar.
    #[serde(default)]
    pub jar: Option<PathBuf>,
    /// Per-run wall-clock limit for the external checker.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            jar: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_launcher() -> String {
    "java".to_owned()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Fully-resolved tool settings, ready to hand to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub launcher: PathBuf,
    pub jar: PathBuf,
    pub timeout_secs: u64,
}

impl Config {
    /// Resolve into a [`ToolConfig`], applying overrides from the CLI.
    pub fn resolve(
        &self,
        jar_override: Option<&Path>,
        timeout_override: Option<u64>,
    ) -> Result<ToolConfig, ConfigError> {
        let jar = jar_override
            .map(Path::to_path_buf)
            .or_else(|| self.tool.jar.clone())
            .ok_or(ConfigError::MissingJar)?;
        let timeout_secs = timeout_override.unwrap_or(self.tool.timeout_secs);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(ToolConfig {
            launcher: PathBuf::from(&self.tool.launcher),
            jar,
            timeout_secs,
        })
    }
}

pub fn parse_config_str(input: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(input)?)
}

/// Load configuration from an explicit path, `$BINDERY_CONFIG`, or
/// `./bindery.toml`, in that order. A missing file yields defaults; an
/// unreadable or malformed file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let candidate = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var(CONFIG_ENV_VAR)
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)))
    });

    match candidate {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(&path)?;
            parse_config_str(&content)
        }
        Some(path) if explicit.is_some() => Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file not found: {}", path.display()),
        ))),
        _ => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = parse_config_str(
            r#"
[tool]
launcher = "/usr/lib/jvm/java-17/bin/java"
jar = "/opt/epubcheck/epubcheck.jar"
timeout_secs = 120
"#,
        )
        .unwrap();
        assert_eq!(config.tool.launcher, "/usr/lib/jvm/java-17/bin/java");
        assert_eq!(
            config.tool.jar.as_deref(),
            Some(Path::new("/opt/epubcheck/epubcheck.jar"))
        );
        assert_eq!(config.tool.timeout_secs, 120);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.tool.launcher, "java");
        assert!(config.tool.jar.is_none());
        assert_eq!(config.tool.timeout_secs, 60);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(parse_config_str("[tool]\nbinary = \"x\"\n").is_err());
    }

    #[test]
    fn resolve_requires_jar() {
        let config = Config::default();
        assert!(matches!(
            config.resolve(None, None),
            Err(ConfigError::MissingJar)
        ));
    }

    #[test]
    fn resolve_applies_overrides() {
        let config = parse_config_str("[tool]\njar = \"/opt/a.jar\"\n").unwrap();
        let tool = config
            .resolve(Some(Path::new("/opt/b.jar")), Some(5))
            .unwrap();
        assert_eq!(tool.jar, Path::new("/opt/b.jar"));
        assert_eq!(tool.timeout_secs, 5);
        assert_eq!(tool.launcher, Path::new("java"));
    }

    #[test]
    fn resolve_rejects_zero_timeout() {
        let config = parse_config_str("[tool]\njar = \"/opt/a.jar\"\ntimeout_secs = 0\n").unwrap();
        assert!(matches!(
            config.resolve(None, None),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn load_config_missing_default_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = load_config(None);
        std::env::set_current_dir(prev).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn load_config_explicit_missing_is_err() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[tool]\njar = \"/opt/epubcheck.jar\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.tool.jar.as_deref(),
            Some(Path::new("/opt/epubcheck.jar"))
        );
    }
}
