use std::fs;
use std::path::Path;
use tempfile::tempdir;

use ows_grade::workflow::{GradingOptions, SubmissionOutcome, grade_submissions, render_json};

const GOOD_WORKFLOW: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<scheme version="2.0" title="" description="">
	<nodes>
		<node id="0" name="File" qualified_name="Orange.widgets.data.owfile.OWFile" project_name="Orange3" version="" title="File" position="(150, 150)" />
		<node id="1" name="Data Table" qualified_name="Orange.widgets.data.owtable.OWTable" project_name="Orange3" version="" title="Data Table" position="(300, 50)" />
		<node id="2" name="Predictions" qualified_name="Orange.widgets.evaluate.owpredictions.OWPredictions" project_name="Orange3" version="" title="Predictions" position="(600, 150)" />
	</nodes>
	<links>
		<link id="0" source_node_id="0" sink_node_id="1" source_channel="Data" sink_channel="Data" enabled="true" source_channel_id="data" sink_channel_id="data" />
	</links>
	<annotations />
	<thumbnail />
	<node_properties>
		<properties node_id="0" format="literal">{'recent_paths': [], 'url': ''}</properties>
		<properties node_id="2" format="literal">{'score_table': {'results': {'CA': 0.7}}}</properties>
	</node_properties>
	<session_state>
		<window_groups />
	</session_state>
</scheme>
"#;

// Helper function to create a submission file
fn write_submission(directory: &Path, name: &str, content: &str) {
    fs::write(directory.join(name), content).expect("Failed to write submission");
}

fn options_for(directory: &Path) -> GradingOptions {
    GradingOptions {
        config_path: directory.join("missing.yaml"),
        paths: vec![directory.to_path_buf()],
        ca_threshold: None,
        no_data: false,
    }
}

#[test]
fn test_batch_continues_past_broken_submissions() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let inbox = temp_dir.path();
    write_submission(inbox, "30102 Lee.ows", GOOD_WORKFLOW);
    write_submission(inbox, "30101 Kim.ows", GOOD_WORKFLOW);
    write_submission(inbox, "30103 Park.ows", "<scheme><nodes>");
    write_submission(inbox, ".~lock.30101 Kim.ows", GOOD_WORKFLOW);
    write_submission(inbox, "notes.txt", "not a workflow");

    let context = grade_submissions(options_for(inbox)).expect("Batch should not fail");

    assert_eq!(context.stats.submissions_found, 3);
    assert_eq!(context.stats.submissions_graded, 2);
    assert_eq!(context.stats.submissions_ungradable, 1);

    let ids: Vec<&str> = context
        .results
        .iter()
        .map(|r| r.submission.student_id.as_str())
        .collect();
    assert_eq!(ids, vec!["30101", "30102", "30103"], "Results should keep path order");

    assert!(matches!(
        context.results[2].outcome,
        SubmissionOutcome::Ungradable { .. }
    ));

    let report = context.results[0].report().expect("First submission should be graded");
    assert_eq!(report.outcome("1-1").map(|o| o.passed), Some(true));
    assert_eq!(report.outcome("1-3").map(|o| o.passed), Some(true));
    assert_eq!(report.outcome("2-1").map(|o| o.passed), Some(false));
    assert_eq!(
        report.outcome("5-1").map(|o| o.passed),
        Some(true),
        "Default threshold accepts any saved accuracy"
    );
}

#[test]
fn test_threshold_override() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    write_submission(temp_dir.path(), "30101 Kim.ows", GOOD_WORKFLOW);

    let mut options = options_for(temp_dir.path());
    options.ca_threshold = Some(0.75);
    let context = grade_submissions(options).unwrap();

    assert_eq!(context.config.ca_threshold, 0.75);
    let report = context.results[0].report().unwrap();
    assert_eq!(report.outcome("5-1").map(|o| o.passed), Some(false));
}

#[test]
fn test_negative_threshold_is_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut options = options_for(temp_dir.path());
    options.ca_threshold = Some(-0.1);

    assert!(grade_submissions(options).is_err());
}

#[test]
fn test_submissions_from_config() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let inbox = temp_dir.path().join("week3");
    fs::create_dir_all(&inbox).unwrap();
    write_submission(&inbox, "30101 Kim.ows", GOOD_WORKFLOW);
    write_submission(&inbox, "30101 Kim.xml", GOOD_WORKFLOW);

    let config_path = temp_dir.path().join("grader.yaml");
    fs::write(
        &config_path,
        format!(
            "submissions:\n  - [\"{}\", \"week3\"]\npattern: \"*.ows\"\nca_threshold: 0.5\ndata_loader: none\n",
            temp_dir.path().display()
        ),
    )
    .unwrap();

    let context = grade_submissions(GradingOptions {
        config_path,
        ..GradingOptions::default()
    })
    .expect("Configured submissions should be graded");

    assert_eq!(context.stats.submissions_found, 1);
    assert_eq!(context.config.ca_threshold, 0.5);
    let report = context.results[0].report().unwrap();
    assert_eq!(report.outcome("1-2").map(|o| o.passed), Some(false));
    assert_eq!(report.outcome("5-1").map(|o| o.passed), Some(true));
}

#[test]
fn test_explicit_file_is_graded_regardless_of_pattern() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    write_submission(temp_dir.path(), "30101 Kim.xml", GOOD_WORKFLOW);

    let mut options = options_for(temp_dir.path());
    options.paths = vec![temp_dir.path().join("30101 Kim.xml")];
    let context = grade_submissions(options).unwrap();

    assert_eq!(context.stats.submissions_graded, 1);
    assert_eq!(context.results[0].submission.student_name, "Kim");
}

#[test]
fn test_missing_submission_path_is_an_error() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut options = options_for(temp_dir.path());
    options.paths = vec![temp_dir.path().join("nowhere")];

    let result = grade_submissions(options);
    assert!(result.is_err(), "A missing path should stop the run");
}

#[test]
fn test_json_report_shape() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    write_submission(temp_dir.path(), "30101 Kim.ows", GOOD_WORKFLOW);

    let mut options = options_for(temp_dir.path());
    options.no_data = true;
    let context = grade_submissions(options).unwrap();
    let json: serde_json::Value = serde_json::from_str(&render_json(&context).unwrap()).unwrap();

    let submission = &json["submissions"][0];
    assert_eq!(submission["student_id"], "30101");
    assert_eq!(submission["outcome"]["status"], "graded");
    assert_eq!(submission["outcome"]["total"], 14);
    assert_eq!(submission["outcome"]["outcomes"][0]["id"], "1-1");
    assert_eq!(submission["outcome"]["data_source"]["source"], "N/A");
}
