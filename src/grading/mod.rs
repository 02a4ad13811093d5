//! Rubric evaluation over workflow documents

pub mod criteria;
mod evaluator;
pub mod rules;
mod source;

pub use criteria::{Criterion, DataSourceReport};
pub use evaluator::{CriterionOutcome, GradeReport, Grader};
pub use rules::OptionalStage;
pub use source::{DataSource, data_source};
