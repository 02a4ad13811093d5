//! Grading of saved visual-workflow (`.ows`) files
//!
//! A submission is parsed into a [`document::Document`], then each rubric
//! line in [`grading::Criterion`] is checked against it by a
//! [`grading::Grader`]. The batch driver in [`workflow`] finds submissions,
//! grades them in parallel and renders the report.

pub mod cli;
pub mod config;
pub mod constants;
pub mod data;
pub mod discovery;
pub mod document;
pub mod errors;
pub mod grading;
pub mod logging;
mod utils;
pub mod value;
pub mod workflow;

pub use utils::{parse_submission_name, process_path};

pub mod prelude {
    pub use crate::errors::{
        data_load_error, file_operation_error, generic_error, literal_syntax_error,
        malformed_document_error, not_found_error, pickle_decoding_error, property_decoding_error,
    };
    pub use crate::errors::{Error, Result};

    pub use crate::data::{
        DataBackend, DataLoader, DataTable, Fetcher, LoaderSummarizer, LocalTableLoader,
        SourceSummarizer, WebTableLoader,
    };
    pub use crate::document::{Document, Link, Node, PropertyValue};
    pub use crate::grading::{Criterion, GradeReport, Grader};
    pub use crate::logging::{LogLevel, format_message, init_logger};
    pub use crate::value::{PathLike, PathRecord, PyValue};
    pub use crate::workflow::{GradingOptions, grade_submissions};
}
