//! Workflow engine
//!
//! This module contains the engine that grades a batch of submissions.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{DataLoaderKind, read_or_default};
use crate::discovery::{SubmissionInfo, discover_submissions};
use crate::document::Document;
use crate::grading::Grader;

use super::context::{GradingContext, SubmissionOutcome, SubmissionResult};

/// Options for grading submissions
#[derive(Debug, Clone, Default)]
pub struct GradingOptions {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Files or directories to grade; when empty the configured ones are used
    pub paths: Vec<PathBuf>,
    /// Overrides the configured accuracy threshold
    pub ca_threshold: Option<f64>,
    /// Skip data source loading
    pub no_data: bool,
}

/// Grades every submission found
///
/// This function orchestrates the workflow steps:
/// 1. Read the configuration and apply the command-line overrides
/// 2. Collect the submission files
/// 3. Load and grade each one in parallel
///
/// A submission that cannot be loaded is recorded as ungradable; it never
/// stops the batch.
///
/// # Errors
/// * Returns an error if the configuration is invalid or a submission path is missing
pub fn grade_submissions(options: GradingOptions) -> Result<GradingContext> {
    // Step 1: Read the configuration
    let mut config = read_or_default(&options.config_path, options.paths.is_empty())?;
    if let Some(threshold) = options.ca_threshold {
        config.ca_threshold = threshold;
    }
    if options.no_data {
        config.data_loader = DataLoaderKind::None;
    }
    config.validate(false)?;

    let paths = if options.paths.is_empty() {
        config.submissions.clone()
    } else {
        options.paths.clone()
    };

    let mut context = GradingContext::new(config.clone());

    // Step 2: Collect the submissions
    let submissions = discover_submissions(&paths, &config.pattern)?;
    if submissions.is_empty() {
        info!("No submissions found");
        return Ok(context);
    }

    info!("Grading {} submissions...", submissions.len());

    // Step 3: Grade them
    let backend = config.data_loader.backend(config.fetch_timeout())?;
    let grader = Grader::new(backend, config.ca_threshold);
    let results: Vec<SubmissionResult> = submissions
        .into_par_iter()
        .map(|submission| grade_submission(&grader, submission))
        .collect();

    for result in results {
        context.add_result(result);
    }

    info!(
        "Finished grading {} submissions ({} ungradable)",
        context.stats.submissions_found, context.stats.submissions_ungradable
    );

    Ok(context)
}

/// Loads and grades one submission
pub fn grade_submission(grader: &Grader, submission: SubmissionInfo) -> SubmissionResult {
    let outcome = grade_file(grader, &submission.path);
    SubmissionResult {
        submission,
        outcome,
    }
}

fn grade_file(grader: &Grader, path: &Path) -> SubmissionOutcome {
    match Document::load(path) {
        Ok(document) => {
            let report = grader.grade(&document);
            debug!(
                "{}: {}/{}",
                path.display(),
                report.passed,
                report.total
            );
            SubmissionOutcome::Graded(report)
        }
        Err(e) => {
            warn!("Cannot grade {}: {}", path.display(), e);
            SubmissionOutcome::Ungradable {
                reason: e.to_string(),
            }
        }
    }
}
