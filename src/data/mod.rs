//! Data sources referenced by workflows
//!
//! Grading only needs to know whether a referenced data source loads and
//! carries a usable schema. How it is loaded is up to the injected
//! [`DataBackend`].

mod loader;
mod remote;
mod table;

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::Result;

pub use loader::LocalTableLoader;
pub use remote::{Fetched, Fetcher, HttpFetcher, WebTableLoader};
pub use table::{DataTable, Variable, VariableKind, VariableRole, describe};

/// Summary prefixes that mark a failed load
pub const FAILURE_PREFIXES: &[&str] = &[
    "Summary unavailable",
    "Data load failed",
    "Data load/analysis error",
];

static ROW_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total \d+ rows").expect("Failed to compile regex pattern for ROW_COUNT")
});

/// Loads a data source into a table
pub trait DataLoader: Send + Sync {
    fn load(&self, source: &str) -> Result<DataTable>;
}

/// Produces a textual summary of a data source
///
/// Used where only a description of the data is trusted. Failures are
/// reported in the text itself, starting with one of [`FAILURE_PREFIXES`].
pub trait SourceSummarizer: Send + Sync {
    fn summarize(&self, source: &str) -> String;
}

/// Summarises a source by loading it and describing the table
pub struct LoaderSummarizer {
    loader: Box<dyn DataLoader>,
}

impl LoaderSummarizer {
    pub fn new(loader: Box<dyn DataLoader>) -> Self {
        LoaderSummarizer { loader }
    }
}

impl SourceSummarizer for LoaderSummarizer {
    fn summarize(&self, source: &str) -> String {
        match self.loader.load(source) {
            Ok(table) => describe(&table),
            Err(e) => format!("{}: {e}", FAILURE_PREFIXES[1]),
        }
    }
}

/// Outcome of checking one data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCheck {
    pub summary: String,
    pub valid: bool,
}

/// The collaborator used to validate data sources
pub enum DataBackend {
    /// Full check through a loader
    Loader(Box<dyn DataLoader>),
    /// Degraded check accepting a summary that reports a row count
    Summary(Box<dyn SourceSummarizer>),
    /// No collaborator; data sources never validate
    Unavailable,
}

impl DataBackend {
    /// Local files only
    pub fn local() -> Self {
        DataBackend::Loader(Box::new(LocalTableLoader))
    }

    /// Local files and web addresses fetched with `timeout`
    pub fn web(timeout: Duration) -> Result<Self> {
        Ok(DataBackend::Loader(Box::new(WebTableLoader::http(timeout)?)))
    }

    /// Textual check over local files and web addresses
    pub fn summary(timeout: Duration) -> Result<Self> {
        let loader = WebTableLoader::http(timeout)?;
        Ok(DataBackend::Summary(Box::new(LoaderSummarizer::new(Box::new(
            loader,
        )))))
    }

    /// Loads or summarises `source` once and reports whether it holds data
    pub fn check(&self, source: &str) -> SourceCheck {
        match self {
            DataBackend::Loader(loader) => match loader.load(source) {
                Ok(table) => SourceCheck {
                    summary: describe(&table),
                    valid: table.has_content(),
                },
                Err(e) => {
                    log::debug!("Data source did not load: {e}");
                    SourceCheck {
                        summary: format!("{}: {e}", FAILURE_PREFIXES[1]),
                        valid: false,
                    }
                }
            },
            DataBackend::Summary(summarizer) => {
                let summary = summarizer.summarize(source);
                let valid = summary_reports_rows(&summary);
                SourceCheck { summary, valid }
            }
            DataBackend::Unavailable => SourceCheck {
                summary: format!("{} (no data backend)", FAILURE_PREFIXES[0]),
                valid: false,
            },
        }
    }
}

impl std::fmt::Debug for DataBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataBackend::Loader(_) => write!(f, "DataBackend::Loader"),
            DataBackend::Summary(_) => write!(f, "DataBackend::Summary"),
            DataBackend::Unavailable => write!(f, "DataBackend::Unavailable"),
        }
    }
}

/// Heuristic acceptance of a textual summary
pub fn summary_reports_rows(summary: &str) -> bool {
    !FAILURE_PREFIXES
        .iter()
        .any(|prefix| summary.starts_with(prefix))
        && ROW_COUNT.is_match(summary)
}
