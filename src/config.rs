//! Benchmark configuration
//!
//! Values come from, in increasing priority: built-in defaults, a JSON
//! config file, and command-line flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(any(feature = "cli", test))]
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::engine::{MAX_BITS, MIN_BITS};

/// Payload hashed by the difficulty sweep
pub const DEFAULT_MESSAGE: &str = "This is the message we are going to provide proof-of-work on";

/// Highest difficulty the sweep reaches
pub const DEFAULT_MAX_BITS: u32 = 64;

/// Wall-clock budget for each difficulty level
pub const DEFAULT_LEVEL_BUDGET_SECS: u64 = 5;

/// Upper bound on solves per difficulty level
pub const DEFAULT_MAX_RUNS: u32 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    InvalidValue(String),
}

/// Difficulty sweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Payload for every solve
    pub message: String,
    /// First difficulty level
    pub start_bits: u32,
    /// Last difficulty level (inclusive)
    pub max_bits: u32,
    /// Seconds spent on each level before moving on
    pub level_budget_secs: u64,
    /// Maximum solves per level
    pub max_runs: u32,
    /// Worker threads per solve (default: number of CPUs)
    pub threads: Option<usize>,
    /// Abort the sweep when a single solve takes longer than this
    pub solve_timeout_secs: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            start_bits: 1,
            max_bits: DEFAULT_MAX_BITS,
            level_budget_secs: DEFAULT_LEVEL_BUDGET_SECS,
            max_runs: DEFAULT_MAX_RUNS,
            threads: None,
            solve_timeout_secs: None,
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub message: Option<String>,
    pub start_bits: Option<u32>,
    pub max_bits: Option<u32>,
    pub level_budget_secs: Option<u64>,
    pub max_runs: Option<u32>,
    pub threads: Option<usize>,
    pub solve_timeout_secs: Option<u64>,
}

impl BenchConfig {
    /// Load a config file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    #[cfg(feature = "cli")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load_from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(message) = &overrides.message {
            self.message = message.clone();
        }
        if let Some(bits) = overrides.start_bits {
            self.start_bits = bits;
        }
        if let Some(bits) = overrides.max_bits {
            self.max_bits = bits;
        }
        if let Some(secs) = overrides.level_budget_secs {
            self.level_budget_secs = secs;
        }
        if let Some(runs) = overrides.max_runs {
            self.max_runs = runs;
        }
        if overrides.threads.is_some() {
            self.threads = overrides.threads;
        }
        if overrides.solve_timeout_secs.is_some() {
            self.solve_timeout_secs = overrides.solve_timeout_secs;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BITS..=MAX_BITS).contains(&self.start_bits) {
            return Err(ConfigError::InvalidValue(format!(
                "start_bits must be between {} and {}, got {}",
                MIN_BITS, MAX_BITS, self.start_bits
            )));
        }
        if self.max_bits < self.start_bits || self.max_bits > MAX_BITS {
            return Err(ConfigError::InvalidValue(format!(
                "max_bits must be between start_bits ({}) and {}, got {}",
                self.start_bits, MAX_BITS, self.max_bits
            )));
        }
        if self.level_budget_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "level_budget_secs must be positive".to_string(),
            ));
        }
        if self.max_runs == 0 {
            return Err(ConfigError::InvalidValue(
                "max_runs must be positive".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue(
                "threads must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn level_budget(&self) -> Duration {
        Duration::from_secs(self.level_budget_secs)
    }

    pub fn solve_timeout(&self) -> Option<Duration> {
        self.solve_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the default config file path
#[cfg(feature = "cli")]
pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("powbench").join("config.json")
}
