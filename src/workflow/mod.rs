//! Workflow module
//!
//! This module contains components for grading a batch of submissions.

mod context;
mod engine;
mod report;

pub use context::{GradingContext, GradingStats, SubmissionOutcome, SubmissionResult};
pub use engine::{GradingOptions, grade_submission, grade_submissions};
pub use report::{render_json, render_text};
