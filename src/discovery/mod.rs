//! Submission discovery module
//!
//! This module contains components for finding workflow files to grade.

mod scanner;

pub use scanner::{SubmissionInfo, discover_submissions};
