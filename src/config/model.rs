//! Configuration data structures

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Deserialize;

use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PATTERN};
use crate::data::DataBackend;

use super::deserializer::deserialize_submission_paths;

/// Which data backend checks the File widget's data source
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataLoaderKind {
    /// Local delimited files and web addresses
    #[default]
    Web,
    /// Local delimited files only
    Local,
    /// Judge sources by their text summary
    Summary,
    /// Do not load anything; criterion 1-2 fails
    None,
}

impl DataLoaderKind {
    /// Builds the backend; `timeout` bounds each web request
    pub fn backend(&self, timeout: Duration) -> Result<DataBackend> {
        Ok(match self {
            DataLoaderKind::Web => DataBackend::web(timeout)?,
            DataLoaderKind::Local => DataBackend::local(),
            DataLoaderKind::Summary => DataBackend::summary(timeout)?,
            DataLoaderKind::None => DataBackend::Unavailable,
        })
    }
}

/// Configuration for the grader
///
/// Every key is optional; a missing file is the same as an empty one.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Workflow files or directories holding them
    #[serde(default, deserialize_with = "deserialize_submission_paths")]
    pub submissions: Vec<PathBuf>,
    /// Glob applied inside submission directories
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Minimum accuracy accepted by criterion 5-1
    #[serde(default)]
    pub ca_threshold: f64,
    #[serde(default)]
    pub data_loader: DataLoaderKind,
    /// Seconds allowed for fetching one web data source
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            submissions: Vec::new(),
            pattern: default_pattern(),
            ca_threshold: 0.0,
            data_loader: DataLoaderKind::default(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Validates the configuration
    ///
    /// # Arguments
    /// * `check_paths` - Whether every submission path must exist
    ///
    /// # Errors
    /// Returns an error with a detailed message if validation fails
    pub fn validate(&self, check_paths: bool) -> Result<()> {
        if !self.ca_threshold.is_finite() || self.ca_threshold < 0.0 {
            return Err(anyhow!(
                "Invalid ca_threshold {}: {}",
                self.ca_threshold,
                "the accuracy threshold must be a non-negative number."
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("Invalid fetch_timeout_secs 0: the timeout must be at least one second."));
        }

        if self.pattern.trim().is_empty() {
            return Err(anyhow!(
                "Empty submission pattern. Use a glob such as \"{DEFAULT_PATTERN}\"."
            ));
        }

        glob::Pattern::new(&self.pattern)
            .map_err(|e| anyhow!("Invalid submission pattern '{}': {}", self.pattern, e))?;

        if check_paths {
            for (index, path) in self.submissions.iter().enumerate() {
                if !path.exists() {
                    return Err(anyhow!(
                        "Submission path {} at index {} does not exist: {}",
                        path.display(),
                        index,
                        "Please check the path and ensure it exists."
                    ));
                }
            }
        }

        Ok(())
    }
}
