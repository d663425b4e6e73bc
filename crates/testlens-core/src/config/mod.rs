//! Configuration management for testlens.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `testlens.toml` file
//! 3. User config `~/.config/testlens/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Test runner configuration.
    pub runner: RunnerConfig,

    /// Source discovery configuration.
    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./testlens.toml` (project local)
    /// 2. `~/.config/testlens/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(program) = std::env::var("TESTLENS_RUNNER_PROGRAM") {
            self.runner.program = program;
        }
        if let Ok(args) = std::env::var("TESTLENS_RUNNER_ARGS") {
            self.runner.args = args.split_whitespace().map(String::from).collect();
        }
        if let Ok(cwd) = std::env::var("TESTLENS_RUNNER_CWD") {
            self.runner.cwd = Some(cwd);
        }
        if let Ok(exts) = std::env::var("TESTLENS_EXTENSIONS") {
            self.discovery.extensions = exts
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.program.trim().is_empty() {
            return Err(ConfigError::Invalid("runner.program must not be empty".into()));
        }
        if self.discovery.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "discovery.extensions must list at least one extension".into(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Test runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program to execute (looked up on `PATH`).
    pub program: String,

    /// Arguments passed before any filter.
    pub args: Vec<String>,

    /// Working directory for the runner. Defaults to the current directory.
    pub cwd: Option<String>,

    /// Extra environment variables for the runner process.
    pub env: BTreeMap<String, String>,

    /// Token placed between `args` and the test filter, if the runner needs one.
    pub filter_separator: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RUNNER_PROGRAM.to_string(),
            args: DEFAULT_RUNNER_ARGS.iter().map(|s| s.to_string()).collect(),
            cwd: None,
            env: BTreeMap::new(),
            filter_separator: None,
        }
    }
}

impl RunnerConfig {
    /// Preset for running a Clarinet project's test suite.
    pub fn clarinet() -> Self {
        Self {
            program: CLARINET_PROGRAM.to_string(),
            args: CLARINET_ARGS.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Full argument list for a run, with the optional filter appended.
    pub fn command_args(&self, filter: Option<&str>) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            if let Some(sep) = &self.filter_separator {
                args.push(sep.clone());
            }
            args.push(filter.to_string());
        }
        args
    }

    /// Working directory as a path, if configured.
    pub fn cwd_path(&self) -> Option<PathBuf> {
        self.cwd.as_ref().map(PathBuf::from)
    }
}

/// Source discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File extensions to scan (without leading dot).
    pub extensions: Vec<String>,

    /// Directory names to skip.
    pub exclude_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Check whether a path has one of the configured extensions.
    pub fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Check whether a directory name is excluded.
    pub fn excludes_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}
