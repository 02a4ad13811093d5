use std::fs;
use tempfile::tempdir;

use ows_grade::document::{Document, PropertyValue};
use ows_grade::errors::Error;
use ows_grade::value::PyValue;

// Helper function to wrap sections into a workflow document
fn scheme(body: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<scheme version="2.0" title="" description="">
{body}
</scheme>"#
    )
}

fn parse(body: &str) -> Document {
    Document::parse(&scheme(body)).expect("Test document should parse")
}

#[test]
fn test_missing_nodes_section() {
    let document = parse(r#"<links /><node_properties />"#);

    for name in ["File", "Data Table", "", "Preprocess"] {
        assert!(
            document.find_node_by_name(name).is_none(),
            "No node should be found for '{name}' without a nodes section"
        );
    }
    assert!(document.nodes().is_empty());
}

#[test]
fn test_id_lookup_trims_but_name_lookup_does_not() {
    let document = parse(
        r#"<nodes>
    <node id="3" name="Data Sampler" qualified_name="Orange.widgets.data.owdatasampler.OWDataSampler" title="Data Sampler" />
    <node id="4" name=" 3 " title="odd" />
</nodes>"#,
    );

    let by_id = document.find_node_by_id(" 3 ");
    assert_eq!(
        by_id.and_then(|node| node.name.as_deref()),
        Some("Data Sampler"),
        "Id lookup should ignore surrounding whitespace"
    );

    assert!(
        document.find_node_by_name(" Data Sampler ").is_none(),
        "Name lookup must be exact"
    );
    assert_eq!(
        document.find_node_by_name(" 3 ").and_then(|node| node.id()),
        Some("4")
    );
    assert!(document.find_node_by_name("3").is_none());
}

#[test]
fn test_first_node_with_name_wins() {
    let document = parse(
        r#"<nodes>
    <node id="7" name="kNN" />
    <node id="8" name="kNN" />
</nodes>"#,
    );
    assert_eq!(document.find_node_by_name("kNN").and_then(|n| n.id()), Some("7"));
}

#[test]
fn test_disabled_link_never_matches() {
    let document = parse(
        r#"<nodes><node id="0" name="File" /><node id="1" name="Data Table" /></nodes>
<links>
    <link id="0" source_node_id="0" sink_node_id="1" source_channel="Data" sink_channel="Data" enabled="false" source_channel_id="data" sink_channel_id="data" />
</links>"#,
    );

    assert!(!document.link_exists("0", "1", "data", "data"));
}

#[test]
fn test_enabled_attribute_is_case_insensitive() {
    let document = parse(
        r#"<links>
    <link id="0" source_node_id="0" sink_node_id="1" enabled="True" source_channel_id="data" sink_channel_id="data" />
</links>"#,
    );

    assert!(document.link_exists("0", "1", "data", "data"));
}

#[test]
fn test_channel_identifier_beats_name() {
    let document = parse(
        r#"<links>
    <link id="0" source_node_id="2" sink_node_id="3" source_channel="Preprocessed Data" sink_channel="Data" source_channel_id="preprocessed_data" sink_channel_id="data" />
</links>"#,
    );

    assert!(document.link_exists("2", "3", "preprocessed_data", "data"));
    assert!(
        !document.link_exists("2", "3", "Preprocessed Data", "Data"),
        "Channel names must not match when identifiers are present"
    );
}

#[test]
fn test_channel_name_used_without_identifier() {
    let document = parse(
        r#"<links>
    <link id="0" source_node_id="0" sink_node_id="1" source_channel="data" sink_channel="data" />
</links>"#,
    );

    assert!(document.link_exists("0", "1", "data", "data"));
    assert!(!document.link_exists(" 0", "1", "data", "data"), "Link ids are not trimmed");
}

#[test]
fn test_literal_properties_are_returned_raw() {
    let document = parse(
        r#"<nodes><node id="0" name="File" /></nodes>
<node_properties>
    <properties node_id="0" format="literal">{'recent_paths': [], 'url': ''}</properties>
</node_properties>"#,
    );

    match document.properties("0") {
        Some(PropertyValue::Literal(text)) => {
            assert_eq!(text, "{'recent_paths': [], 'url': ''}");
        }
        other => panic!("Expected literal text, got {other:?}"),
    }
}

#[test]
fn test_missing_format_defaults_to_literal() {
    let document = parse(
        r#"<node_properties>
    <properties node_id="0">{'sampling_type': 0}</properties>
</node_properties>"#,
    );

    let settings = document
        .properties("0")
        .and_then(PropertyValue::into_structured);
    assert_eq!(
        settings.and_then(|s| s.get("sampling_type").cloned()),
        Some(PyValue::Int(0))
    );
}

#[test]
fn test_pickle_properties_are_decoded() {
    // pickle protocol 2 of {'k': 1}
    let document = parse(
        r#"<node_properties>
    <properties node_id="5" format="pickle">gAJ9cQBYAQAAAGtxAUsBcy4=</properties>
</node_properties>"#,
    );

    match document.properties("5") {
        Some(PropertyValue::Object(value)) => {
            assert_eq!(value.get("k"), Some(&PyValue::Int(1)));
        }
        other => panic!("Expected a decoded object, got {other:?}"),
    }
}

#[test]
fn test_broken_pickle_is_absent() {
    let document = parse(
        r#"<node_properties>
    <properties node_id="5" format="pickle">not base64 at all!!</properties>
    <properties node_id="6" format="pickle">gAJ9cQBYAQAA</properties>
</node_properties>"#,
    );

    assert!(document.properties("5").is_none());
    assert!(document.properties("6").is_none());
    assert!(document.properties("7").is_none(), "Unknown node has no settings");
}

#[test]
fn test_load_missing_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let result = Document::load(temp_dir.path().join("30101 Kim.ows"));

    assert!(
        matches!(result, Err(Error::NotFound { .. })),
        "Missing file should be reported as not found: {result:?}"
    );
}

#[test]
fn test_load_malformed_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("broken.ows");
    fs::write(&path, "<scheme><nodes><node id='0' name='File'></nodes>").unwrap();

    let result = Document::load(&path);
    assert!(
        matches!(result, Err(Error::MalformedDocument { .. })),
        "Unbalanced XML should be malformed: {result:?}"
    );
}

#[test]
fn test_load_well_formed_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("30101 Kim.ows");
    fs::write(
        &path,
        scheme(r#"<nodes><node id="0" name="File" /></nodes><links /><node_properties />"#),
    )
    .unwrap();

    let document = Document::load(&path).expect("Document should load");
    assert_eq!(document.nodes().len(), 1);
    assert!(document.links().is_empty());
}
