//! Workflow context
//!
//! This module defines the state collected while grading a batch.

use serde::Serialize;

use crate::config::Config;
use crate::discovery::SubmissionInfo;
use crate::grading::GradeReport;

/// What happened to one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    /// The document loaded and the rubric ran
    Graded(GradeReport),
    /// The document could not be loaded
    Ungradable { reason: String },
}

/// One submission with its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    #[serde(flatten)]
    pub submission: SubmissionInfo,
    pub outcome: SubmissionOutcome,
}

impl SubmissionResult {
    pub fn report(&self) -> Option<&GradeReport> {
        match &self.outcome {
            SubmissionOutcome::Graded(report) => Some(report),
            SubmissionOutcome::Ungradable { .. } => None,
        }
    }
}

/// Statistics about the batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GradingStats {
    pub submissions_found: usize,
    pub submissions_graded: usize,
    pub submissions_ungradable: usize,
}

/// Context for the grading workflow
#[derive(Debug, Clone)]
pub struct GradingContext {
    /// The configuration in effect, after command-line overrides
    pub config: Config,
    pub stats: GradingStats,
    /// Results in submission order
    pub results: Vec<SubmissionResult>,
}

impl GradingContext {
    pub fn new(config: Config) -> Self {
        GradingContext {
            config,
            stats: GradingStats::default(),
            results: Vec::new(),
        }
    }

    /// Records a result and updates the statistics
    pub fn add_result(&mut self, result: SubmissionResult) {
        self.increment_submissions_found();
        match result.outcome {
            SubmissionOutcome::Graded(_) => self.increment_submissions_graded(),
            SubmissionOutcome::Ungradable { .. } => self.increment_submissions_ungradable(),
        }
        self.results.push(result);
    }

    /// Increments the number of submissions found
    pub fn increment_submissions_found(&mut self) {
        self.stats.submissions_found += 1;
    }

    /// Increments the number of submissions graded
    pub fn increment_submissions_graded(&mut self) {
        self.stats.submissions_graded += 1;
    }

    /// Increments the number of submissions that could not be graded
    pub fn increment_submissions_ungradable(&mut self) {
        self.stats.submissions_ungradable += 1;
    }
}
