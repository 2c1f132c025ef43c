//! Run configuration.
//!
//! A small, closed configuration value: the four fields below are all a run
//! can be parameterized with, and unknown keys in a config file are rejected
//! at load time.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the roundtrip campaign does after a failing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailPolicy {
    /// Record the failure and keep going (default).
    ContinueOnFail,
    /// Halt the campaign on the first failure.
    StopOnFail,
}

/// Configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Root of the output tree (`gen/`, `output/`, `raw_reports/`).
    pub output_root: PathBuf,
    /// Explicit compiler command tried before the discovery order.
    pub toolchain_hint: Option<String>,
    /// Number of campaign loops when the caller does not override it.
    pub default_loops: u32,
    pub fail_policy: FailPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("out"),
            toolchain_hint: None,
            default_loops: 10,
            fail_policy: FailPolicy::ContinueOnFail,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file does not match the schema: {0}")]
    Parse(#[from] serde_yml::Error),
}

impl Config {
    /// Loads a configuration file, rejecting unknown keys.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yml::from_str(&input)?)
    }
}
