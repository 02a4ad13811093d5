//! Finding submitted workflow files

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use glob::glob;
use log::{debug, warn};
use serde::Serialize;

use crate::utils::{is_hidden_file, parse_submission_name};

/// A workflow file handed in by a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionInfo {
    pub path: PathBuf,
    /// File stem up to the first space
    pub student_id: String,
    /// File stem after the first space
    pub student_name: String,
}

impl SubmissionInfo {
    pub fn new(path: PathBuf) -> Self {
        let (student_id, student_name) = parse_submission_name(&path);
        SubmissionInfo {
            path,
            student_id,
            student_name,
        }
    }
}

/// Collects submissions from files and directories
///
/// Files are taken as given, even when they do not match the pattern.
/// Directories are searched with `pattern` (non-recursive unless the
/// pattern says otherwise). Hidden files are skipped and the result is
/// sorted by path without duplicates.
///
/// # Errors
/// Returns an error if a path does not exist or the pattern is invalid
pub fn discover_submissions(paths: &[PathBuf], pattern: &str) -> Result<Vec<SubmissionInfo>> {
    let mut found: Vec<PathBuf> = Vec::new();

    for path in paths {
        if path.is_file() {
            found.push(path.clone());
        } else if path.is_dir() {
            found.extend(scan_directory(path, pattern)?);
        } else {
            return Err(anyhow!("Submission path does not exist: {}", path.display()));
        }
    }

    found.sort();
    found.dedup();
    debug!("Discovered {} submissions", found.len());

    Ok(found.into_iter().map(SubmissionInfo::new).collect())
}

fn scan_directory(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    debug!("Scanning directory: {}", directory.display());

    let base = directory
        .to_str()
        .ok_or_else(|| anyhow!("Invalid directory path: {}", directory.display()))?;
    // brackets in directory names are not glob classes
    let full_pattern = Path::new(&glob::Pattern::escape(base)).join(pattern);
    let full_pattern = full_pattern
        .to_str()
        .ok_or_else(|| anyhow!("Invalid glob pattern: {pattern}"))?;

    let mut files = Vec::new();
    for entry in glob(full_pattern).map_err(|e| anyhow!("Invalid glob pattern '{pattern}': {e}"))? {
        match entry {
            Ok(path) if path.is_file() && !is_hidden_file(&path) => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }

    Ok(files)
}
