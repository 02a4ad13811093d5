//! Running the rubric over one document

use log::debug;
use serde::Serialize;

use crate::data::DataBackend;
use crate::document::Document;

use super::criteria::{self, Criterion, DataSourceReport};

/// Result of one rubric line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionOutcome {
    pub id: &'static str,
    pub title: &'static str,
    pub passed: bool,
}

/// Rubric results for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub outcomes: Vec<CriterionOutcome>,
    pub passed: usize,
    pub total: usize,
    /// Present when the document has a File widget with mapping settings
    pub data_source: Option<DataSourceReport>,
}

impl GradeReport {
    pub fn outcome(&self, id: &str) -> Option<&CriterionOutcome> {
        self.outcomes.iter().find(|outcome| outcome.id == id)
    }
}

/// Grades documents against the rubric
#[derive(Debug)]
pub struct Grader {
    backend: DataBackend,
    ca_threshold: f64,
}

impl Grader {
    pub fn new(backend: DataBackend, ca_threshold: f64) -> Self {
        Grader {
            backend,
            ca_threshold,
        }
    }

    /// Evaluates a single rubric line
    pub fn evaluate(&self, criterion: Criterion, document: &Document) -> bool {
        match criterion {
            Criterion::FileWidget => criteria::file_widget_used(document),
            Criterion::FileData => criteria::file_data_loads(document, &self.backend),
            Criterion::FileToDataTable => criteria::file_linked_to_data_table(document),
            Criterion::PreprocessWidget => criteria::preprocess_widget_used(document),
            Criterion::ImputeSetting => criteria::impute_configured(document),
            Criterion::FileToPreprocess => criteria::file_linked_to_preprocess(document),
            Criterion::SamplerWidget => criteria::sampler_widget_used(document),
            Criterion::SamplerSettings => criteria::sampler_configured(document),
            Criterion::SamplerInput => criteria::sampler_input_linked(document),
            Criterion::KnnModel => criteria::knn_linked(document),
            Criterion::TreeModel => criteria::tree_linked(document),
            Criterion::LogisticRegressionModel => criteria::logistic_regression_linked(document),
            Criterion::PredictionAccuracy => {
                criteria::accuracy_at_least(document, self.ca_threshold)
            }
            Criterion::PredictionInput => criteria::sampler_linked_to_predictions(document),
        }
    }

    /// Evaluates the whole rubric
    ///
    /// The data source is checked once and that result backs criterion 1-2.
    pub fn grade(&self, document: &Document) -> GradeReport {
        let data_source = criteria::inspect_data_source(document, &self.backend);

        let outcomes: Vec<CriterionOutcome> = Criterion::ALL
            .iter()
            .map(|&criterion| {
                let passed = match criterion {
                    Criterion::FileData => data_source.as_ref().is_some_and(|report| report.valid),
                    other => self.evaluate(other, document),
                };
                debug!("{} {}: {passed}", criterion.id(), criterion.title());
                CriterionOutcome {
                    id: criterion.id(),
                    title: criterion.title(),
                    passed,
                }
            })
            .collect();

        GradeReport {
            passed: outcomes.iter().filter(|outcome| outcome.passed).count(),
            total: outcomes.len(),
            outcomes,
            data_source,
        }
    }
}

impl Default for Grader {
    fn default() -> Self {
        Grader::new(DataBackend::local(), 0.0)
    }
}
