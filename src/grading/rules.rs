//! Building blocks shared by the rubric criteria
//!
//! Every function here is total: a missing node, missing settings or a
//! settings blob of the wrong shape all come back as `false` or `None`.

use log::trace;

use crate::document::Document;
use crate::value::PyValue;

/// Whether a node of this widget type exists
pub fn node_exists(document: &Document, name: &str) -> bool {
    document.find_node_by_name(name).is_some()
}

/// Id of the first node with this widget type, if it has a usable id
pub fn node_id<'a>(document: &'a Document, name: &str) -> Option<&'a str> {
    document.find_node_by_name(name)?.id()
}

/// Structured settings of the first node with this widget type
pub fn settings_of(document: &Document, name: &str) -> Option<PyValue> {
    let id = node_id(document, name)?;
    let settings = document.properties(id)?.into_structured();
    if settings.is_none() {
        trace!("Settings of '{name}' are not structured");
    }
    settings
}

/// Whether the named widgets are joined by an enabled link on the given channels
pub fn linked(
    document: &Document,
    source: &str,
    sink: &str,
    source_channel: &str,
    sink_channel: &str,
) -> bool {
    match (node_id(document, source), node_id(document, sink)) {
        (Some(source_id), Some(sink_id)) => {
            document.link_exists(source_id, sink_id, source_channel, sink_channel)
        }
        _ => false,
    }
}

/// Numeric equality with Python semantics (`0 == 0.0 == False`)
pub fn number_equals(value: Option<&PyValue>, expected: f64) -> bool {
    value.and_then(PyValue::as_number) == Some(expected)
}

/// A link into `sink` that must pass through an optional intermediate stage
///
/// When the stage widget is on the canvas only the link from the stage
/// counts, so wiring around it fails even if that link exists. When the
/// stage is absent the direct link from `fallback` is accepted.
#[derive(Debug, Clone, Copy)]
pub struct OptionalStage<'a> {
    pub stage: &'a str,
    pub stage_channel: &'a str,
    pub fallback: &'a str,
    pub fallback_channel: &'a str,
    pub sink: &'a str,
    pub sink_channel: &'a str,
}

impl OptionalStage<'_> {
    pub fn satisfied(&self, document: &Document) -> bool {
        if node_exists(document, self.stage) {
            linked(
                document,
                self.stage,
                self.sink,
                self.stage_channel,
                self.sink_channel,
            )
        } else {
            linked(
                document,
                self.fallback,
                self.sink,
                self.fallback_channel,
                self.sink_channel,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLER_INPUT: OptionalStage<'static> = OptionalStage {
        stage: "Preprocess",
        stage_channel: "preprocessed_data",
        fallback: "File",
        fallback_channel: "data",
        sink: "Data Sampler",
        sink_channel: "data",
    };

    fn document(nodes: &str, links: &str) -> Document {
        Document::parse(&format!(
            "<scheme><nodes>{nodes}</nodes><links>{links}</links></scheme>"
        ))
        .unwrap()
    }

    #[test]
    fn test_node_id_requires_non_empty_id() {
        let doc = document(r#"<node id="" name="File"/><node id="1" name="Data Table"/>"#, "");
        assert!(node_exists(&doc, "File"));
        assert_eq!(node_id(&doc, "File"), None);
        assert_eq!(node_id(&doc, "Data Table"), Some("1"));
        assert!(!linked(&doc, "File", "Data Table", "data", "data"));
    }

    #[test]
    fn test_optional_stage_present_rejects_bypass() {
        let doc = document(
            r#"<node id="0" name="File"/><node id="2" name="Preprocess"/><node id="3" name="Data Sampler"/>"#,
            r#"<link source_node_id="0" sink_node_id="3" source_channel_id="data" sink_channel_id="data"/>"#,
        );
        assert!(!SAMPLER_INPUT.satisfied(&doc));
    }

    #[test]
    fn test_optional_stage_present_through_stage() {
        let doc = document(
            r#"<node id="0" name="File"/><node id="2" name="Preprocess"/><node id="3" name="Data Sampler"/>"#,
            r#"<link source_node_id="2" sink_node_id="3" source_channel_id="preprocessed_data" sink_channel_id="data"/>"#,
        );
        assert!(SAMPLER_INPUT.satisfied(&doc));
    }

    #[test]
    fn test_optional_stage_absent_accepts_direct_link() {
        let doc = document(
            r#"<node id="0" name="File"/><node id="3" name="Data Sampler"/>"#,
            r#"<link source_node_id="0" sink_node_id="3" source_channel_id="data" sink_channel_id="data"/>"#,
        );
        assert!(SAMPLER_INPUT.satisfied(&doc));
    }

    #[test]
    fn test_number_equals() {
        assert!(number_equals(Some(&PyValue::Int(80)), 80.0));
        assert!(number_equals(Some(&PyValue::Float(80.0)), 80.0));
        assert!(number_equals(Some(&PyValue::Bool(false)), 0.0));
        assert!(!number_equals(Some(&PyValue::Str("80".to_string())), 80.0));
        assert!(!number_equals(None, 80.0));
    }
}
