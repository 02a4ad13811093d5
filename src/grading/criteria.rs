//! The grading rubric
//!
//! One predicate per rubric line. The reference solution wires
//! File → Preprocess → Data Sampler, trains kNN, Tree and Logistic
//! Regression on the sample and scores them in Predictions on the rest.

use log::debug;
use serde::Serialize;

use crate::data::DataBackend;
use crate::document::Document;
use crate::value::PyValue;

use super::rules::{OptionalStage, linked, node_exists, number_equals, settings_of};
use super::source::data_source;

pub const FILE: &str = "File";
pub const DATA_TABLE: &str = "Data Table";
pub const PREPROCESS: &str = "Preprocess";
pub const DATA_SAMPLER: &str = "Data Sampler";
pub const KNN: &str = "kNN";
pub const TREE: &str = "Tree";
pub const LOGISTIC_REGRESSION: &str = "Logistic Regression";
pub const PREDICTIONS: &str = "Predictions";

const IMPUTE_PREPROCESSOR: &str = "orange.preprocess.impute";
const IMPUTE_METHOD: f64 = 5.0;
const SAMPLING_TYPE: f64 = 0.0;
const SAMPLE_PERCENTAGE: f64 = 80.0;

const SAMPLER_INPUT: OptionalStage<'static> = OptionalStage {
    stage: PREPROCESS,
    stage_channel: "preprocessed_data",
    fallback: FILE,
    fallback_channel: "data",
    sink: DATA_SAMPLER,
    sink_channel: "data",
};

/// A rubric line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Criterion {
    FileWidget,
    FileData,
    FileToDataTable,
    PreprocessWidget,
    ImputeSetting,
    FileToPreprocess,
    SamplerWidget,
    SamplerSettings,
    SamplerInput,
    KnnModel,
    TreeModel,
    LogisticRegressionModel,
    PredictionAccuracy,
    PredictionInput,
}

impl Criterion {
    /// Every rubric line in report order
    pub const ALL: [Criterion; 14] = [
        Criterion::FileWidget,
        Criterion::FileData,
        Criterion::FileToDataTable,
        Criterion::PreprocessWidget,
        Criterion::ImputeSetting,
        Criterion::FileToPreprocess,
        Criterion::SamplerWidget,
        Criterion::SamplerSettings,
        Criterion::SamplerInput,
        Criterion::KnnModel,
        Criterion::TreeModel,
        Criterion::LogisticRegressionModel,
        Criterion::PredictionAccuracy,
        Criterion::PredictionInput,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Criterion::FileWidget => "1-1",
            Criterion::FileData => "1-2",
            Criterion::FileToDataTable => "1-3",
            Criterion::PreprocessWidget => "2-1",
            Criterion::ImputeSetting => "2-2",
            Criterion::FileToPreprocess => "2-3",
            Criterion::SamplerWidget => "3-1",
            Criterion::SamplerSettings => "3-2",
            Criterion::SamplerInput => "3-3",
            Criterion::KnnModel => "4-1",
            Criterion::TreeModel => "4-2",
            Criterion::LogisticRegressionModel => "4-3",
            Criterion::PredictionAccuracy => "5-1",
            Criterion::PredictionInput => "5-2",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Criterion::FileWidget => "File widget used",
            Criterion::FileData => "Data source loads with content",
            Criterion::FileToDataTable => "File connected to Data Table",
            Criterion::PreprocessWidget => "Preprocess widget used",
            Criterion::ImputeSetting => "Preprocess imputes missing values",
            Criterion::FileToPreprocess => "File connected to Preprocess",
            Criterion::SamplerWidget => "Data Sampler used",
            Criterion::SamplerSettings => "Data Sampler takes a fixed 80% sample",
            Criterion::SamplerInput => "Preprocess (or File) connected to Data Sampler",
            Criterion::KnnModel => "kNN trained on the sample",
            Criterion::TreeModel => "Tree trained on the sample",
            Criterion::LogisticRegressionModel => "Logistic Regression trained on the sample",
            Criterion::PredictionAccuracy => "Predictions reports classification accuracy",
            Criterion::PredictionInput => "Remaining data sent to Predictions",
        }
    }

    /// Looks a criterion up by its printed id, e.g. `3-2`
    pub fn from_id(id: &str) -> Option<Criterion> {
        Criterion::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// What the File widget's data source turned out to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceReport {
    /// Label of the source, `N/A` when none was found
    pub source: String,
    pub summary: String,
    pub valid: bool,
}

/// 1-1
pub fn file_widget_used(document: &Document) -> bool {
    node_exists(document, FILE)
}

/// Checks the File widget's data source against the backend
///
/// `None` when there is no File widget or its settings are not a mapping;
/// otherwise a report, valid only when the source loaded with content.
pub fn inspect_data_source(document: &Document, backend: &DataBackend) -> Option<DataSourceReport> {
    let settings = settings_of(document, FILE).filter(PyValue::is_dict)?;

    let report = match data_source(&settings) {
        Some(source) => {
            let check = backend.check(&source.location);
            DataSourceReport {
                source: source.label,
                summary: check.summary,
                valid: check.valid,
            }
        }
        None => DataSourceReport {
            source: "N/A".to_string(),
            summary: "No data source found".to_string(),
            valid: false,
        },
    };
    debug!("Data source {}: {}", report.source, report.summary);
    Some(report)
}

/// 1-2
pub fn file_data_loads(document: &Document, backend: &DataBackend) -> bool {
    inspect_data_source(document, backend).is_some_and(|report| report.valid)
}

/// 1-3
pub fn file_linked_to_data_table(document: &Document) -> bool {
    linked(document, FILE, DATA_TABLE, "data", "data")
}

/// 2-1
pub fn preprocess_widget_used(document: &Document) -> bool {
    node_exists(document, PREPROCESS)
}

/// 2-2: an impute step with the reference method among the stored preprocessors
pub fn impute_configured(document: &Document) -> bool {
    let Some(settings) = settings_of(document, PREPROCESS) else {
        return false;
    };
    let Some(preprocessors) = settings
        .get_path(&["storedsettings", "preprocessors"])
        .and_then(PyValue::as_sequence)
    else {
        return false;
    };

    preprocessors.iter().any(|step| match step.as_pair() {
        Some((name, parameters)) => {
            name.as_str() == Some(IMPUTE_PREPROCESSOR)
                && parameters.is_dict()
                && number_equals(parameters.get("method"), IMPUTE_METHOD)
        }
        None => false,
    })
}

/// 2-3
pub fn file_linked_to_preprocess(document: &Document) -> bool {
    linked(document, FILE, PREPROCESS, "data", "data")
}

/// 3-1
pub fn sampler_widget_used(document: &Document) -> bool {
    node_exists(document, DATA_SAMPLER)
}

/// 3-2: fixed proportion sampling of 80%
pub fn sampler_configured(document: &Document) -> bool {
    match settings_of(document, DATA_SAMPLER) {
        Some(settings) if settings.is_dict() => {
            number_equals(settings.get("sampling_type"), SAMPLING_TYPE)
                && number_equals(settings.get("sampleSizePercentage"), SAMPLE_PERCENTAGE)
        }
        _ => false,
    }
}

/// 3-3
pub fn sampler_input_linked(document: &Document) -> bool {
    SAMPLER_INPUT.satisfied(document)
}

/// 4-1
pub fn knn_linked(document: &Document) -> bool {
    linked(document, DATA_SAMPLER, KNN, "data_sample", "data")
}

/// 4-2
pub fn tree_linked(document: &Document) -> bool {
    linked(document, DATA_SAMPLER, TREE, "data_sample", "data")
}

/// 4-3
pub fn logistic_regression_linked(document: &Document) -> bool {
    linked(document, DATA_SAMPLER, LOGISTIC_REGRESSION, "data_sample", "data")
}

/// Classification accuracy saved in the Predictions score table
pub fn saved_accuracy(document: &Document) -> Option<f64> {
    let settings = settings_of(document, PREDICTIONS)?;
    let score_table = settings.get("score_table").filter(|table| table.is_dict())?;
    let results = score_table.get("results").unwrap_or(score_table);
    results.find_number("CA")
}

/// 5-1
pub fn accuracy_at_least(document: &Document, threshold: f64) -> bool {
    saved_accuracy(document).is_some_and(|ca| ca >= threshold)
}

/// 5-2
pub fn sampler_linked_to_predictions(document: &Document) -> bool {
    linked(document, DATA_SAMPLER, PREDICTIONS, "remaining_data", "data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let ids: Vec<&str> = Criterion::ALL.iter().map(Criterion::id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(Criterion::from_id("3-3"), Some(Criterion::SamplerInput));
        assert_eq!(Criterion::from_id("9-9"), None);
    }

    #[test]
    fn test_accuracy_prefers_results_entry() {
        let document = Document::parse(
            r#"<scheme><nodes><node id="8" name="Predictions"/></nodes><node_properties>
<properties node_id="8" format="literal">{'score_table': {'CA': 0.1, 'results': [{'model': 'kNN', 'CA': 0.82}]}}</properties>
</node_properties></scheme>"#,
        )
        .unwrap();
        assert_eq!(saved_accuracy(&document), Some(0.82));
        assert!(accuracy_at_least(&document, 0.8));
        assert!(!accuracy_at_least(&document, 0.9));
    }
}
