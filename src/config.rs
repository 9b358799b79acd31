//! Agent configuration and its validation.

use std::time::Duration;

use crate::collector::SharedBuffers;
use crate::metrics::{MetricToggles, Unit};

pub const DEFAULT_NAMESPACE: &str = "System/Linux";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_MEMORY_UNIT: &str = "MB";
pub const DEFAULT_DISK_UNIT: &str = "GB";
pub const DEFAULT_DISK_PATHS: &str = "/";
pub const DEFAULT_PROC_PATH: &str = "/proc";

/// Configuration error detected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidUnit {
        category: &'static str,
        symbol: String,
    },
    NoMetricsSelected,
    NoDiskPaths,
    InvalidInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidUnit { category, symbol } => {
                write!(f, "invalid {} unit '{}'", category, symbol)
            }
            ConfigError::NoMetricsSelected => write!(f, "no metrics selected"),
            ConfigError::NoDiskPaths => write!(f, "disk metrics selected but no disk paths given"),
            ConfigError::InvalidInterval => write!(f, "interval must be at least 1 minute"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Raw configuration as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub namespace: String,
    pub interval_minutes: u64,
    pub run_once: bool,
    pub toggles: MetricToggles,
    pub memory_unit: String,
    pub disk_unit: String,
    /// Comma-separated list of paths.
    pub disk_paths: String,
    pub shared_buffers_as_used: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            run_once: false,
            toggles: MetricToggles::default(),
            memory_unit: DEFAULT_MEMORY_UNIT.to_string(),
            disk_unit: DEFAULT_DISK_UNIT.to_string(),
            disk_paths: DEFAULT_DISK_PATHS.to_string(),
            shared_buffers_as_used: false,
        }
    }
}

/// Configuration after validation; units and paths are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub namespace: String,
    pub interval: Duration,
    pub run_once: bool,
    pub toggles: MetricToggles,
    pub memory_unit: Unit,
    pub disk_unit: Unit,
    pub disk_paths: Vec<String>,
    pub shared_buffers: SharedBuffers,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let memory_unit = parse_unit("memory", &self.memory_unit)?;
        let disk_unit = parse_unit("disk", &self.disk_unit)?;

        if !self.toggles.any_memory() && !self.toggles.any_disk() {
            return Err(ConfigError::NoMetricsSelected);
        }
        let disk_paths = split_paths(&self.disk_paths);
        if self.toggles.any_disk() && disk_paths.is_empty() {
            return Err(ConfigError::NoDiskPaths);
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        Ok(ValidatedConfig {
            namespace: self.namespace.clone(),
            interval: Duration::from_secs(self.interval_minutes.saturating_mul(60)),
            run_once: self.run_once,
            toggles: self.toggles,
            memory_unit,
            disk_unit,
            disk_paths,
            shared_buffers: SharedBuffers::from_flag(self.shared_buffers_as_used),
        })
    }
}

fn parse_unit(category: &'static str, symbol: &str) -> Result<Unit, ConfigError> {
    symbol.parse().map_err(|_| ConfigError::InvalidUnit {
        category,
        symbol: symbol.to_string(),
    })
}

/// Splits a comma-separated path list, trimming entries and dropping empty ones.
pub fn split_paths(paths: &str) -> Vec<String> {
    paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
