//! Configuration loading functionality

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::debug;
use serde_yaml::from_str;

use crate::utils::find_project_folder;

use super::model::Config;

/// Loads a configuration from a file
///
/// # Arguments
/// * `file` - Path to the configuration file
/// * `check_paths` - Whether configured submission paths must exist
///
/// # Errors
/// Returns an error if the file cannot be read or if the configuration is invalid
pub fn load_config(file: &Path, check_paths: bool) -> Result<Config> {
    let file_content = fs::read(file).map_err(|e| {
        anyhow!(
            "Failed to read configuration file {}: {}",
            file.display(),
            e
        )
    })?;

    let content_str = String::from_utf8(file_content).map_err(|e| {
        anyhow!(
            "Configuration file {} contains invalid UTF-8 characters: {}",
            file.display(),
            e
        )
    })?;

    let config: Config = if content_str.trim().is_empty() {
        Config::default()
    } else {
        from_str(&content_str).map_err(|e| {
            anyhow!(
                "Failed to parse configuration file {}: {}\nPlease check the YAML syntax.",
                file.display(),
                e
            )
        })?
    };

    config.validate(check_paths)?;

    Ok(config)
}

/// Finds the configuration file to use
///
/// The given path wins when it exists; otherwise the same name is looked
/// up in the platform configuration directory.
pub fn locate_config(config: &Path) -> Option<PathBuf> {
    if config.exists() {
        return Some(config.to_path_buf());
    }

    match find_project_folder() {
        Ok(folder) => {
            let candidate = folder.config_dir().join(config);
            candidate.exists().then_some(candidate)
        }
        Err(e) => {
            debug!("No configuration directory available: {e}");
            None
        }
    }
}

/// Loads the configuration if one can be found, defaults otherwise
pub fn read_or_default(config: &Path, check_paths: bool) -> Result<Config> {
    match locate_config(config) {
        Some(path) => {
            debug!("Reading configuration from {}", path.display());
            load_config(&path, check_paths)
        }
        None => {
            debug!(
                "Configuration file {} not found, using defaults",
                config.display()
            );
            Ok(Config::default())
        }
    }
}
