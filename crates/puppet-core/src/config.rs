//! Engine configuration.
//!
//! The configuration lives in `puppet-config.yaml`. This module defines
//! strongly-typed structs that mirror the YAML structure and a loader that
//! reads the file and applies environment overrides. Every field has a
//! default, so an empty (or missing) file yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use puppet_agents::MemoryLimits;

use crate::scheduler::SchedulerConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Driver loop timing and randomness.
    #[serde(default)]
    pub engine: DriverConfig,

    /// Scheduling jitter and fallback intervals.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Memory capacities applied to every agent.
    #[serde(default)]
    pub memory: MemoryLimits,

    /// Where agent definitions live.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Monitoring HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    ///
    /// After parsing, environment variables override file values:
    /// - `PUPPET_AGENTS_DIR` overrides `agents.config_dir`
    /// - `PUPPET_OBSERVER_PORT` overrides `observer.port`
    /// - `PUPPET_LOG_LEVEL` overrides `logging.level`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults (with
    /// environment overrides applied either way).
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. An empty string yields the
    /// defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override file values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("PUPPET_AGENTS_DIR") {
            self.agents.config_dir = PathBuf::from(dir);
        }
        if let Ok(port) = std::env::var("PUPPET_OBSERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.observer.port = port;
        }
        if let Ok(level) = std::env::var("PUPPET_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Driver loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Seconds between mention polls (one agent per poll).
    #[serde(default = "default_mention_poll_interval_secs")]
    pub mention_poll_interval_secs: u64,

    /// Fixed seed for reproducible runs; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            mention_poll_interval_secs: default_mention_poll_interval_secs(),
            seed: None,
        }
    }
}

/// Agent definition location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Directory of `*.json` agent definitions.
    #[serde(default = "default_agents_dir")]
    pub config_dir: PathBuf,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            config_dir: default_agents_dir(),
        }
    }
}

/// Monitoring server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Host to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_observer_port")]
    pub port: u16,

    /// Whether to start the server at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
            enabled: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

const fn default_tick_interval_secs() -> u64 {
    60
}

const fn default_mention_poll_interval_secs() -> u64 {
    30
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}
