use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

use ows_grade::config::{Config, DataLoaderKind, load_config, read_or_default};
use ows_grade::data::DataBackend;

// Helper function to create a test configuration file and parse it
fn parse_test_config(config_content: &str) -> anyhow::Result<Config> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("grader.yaml");

    fs::write(&config_path, config_content)?;

    load_config(&config_path, false)
}

#[test]
fn test_full_configuration() {
    let config = parse_test_config(
        r#"
submissions:
  - "/srv/grading/inbox"
  - - "/srv"
    - "grading"
    - "late"
pattern: "*.ows"
ca_threshold: 0.75
data_loader: none
"#,
    )
    .expect("Valid configuration should parse");

    assert_eq!(
        config.submissions,
        vec![
            PathBuf::from("/srv/grading/inbox"),
            PathBuf::from("/srv/grading/late")
        ]
    );
    assert_eq!(config.ca_threshold, 0.75);
    assert_eq!(config.data_loader, DataLoaderKind::None);
}

#[test]
fn test_every_key_is_optional() {
    let config = parse_test_config("ca_threshold: 0.5\n").expect("Partial configuration should parse");

    assert!(config.submissions.is_empty());
    assert_eq!(config.pattern, "*.ows");
    assert_eq!(config.data_loader, DataLoaderKind::Web);
    assert_eq!(config.fetch_timeout_secs, 30);

    let empty = parse_test_config("").expect("Empty configuration should parse");
    assert_eq!(empty, Config::default());
}

#[test]
fn test_tilde_is_expanded() {
    let config = parse_test_config("submissions:\n  - [\"~\", \"inbox\"]\n").unwrap();

    let path = &config.submissions[0];
    assert!(path.ends_with("inbox"));
    assert!(
        !path.starts_with("~"),
        "Tilde should be expanded: {}",
        path.display()
    );
}

#[test]
fn test_negative_threshold() {
    let result = parse_test_config("ca_threshold: -1\n");
    assert!(result.is_err(), "Negative threshold should fail validation");

    let error = result.err().unwrap();
    assert!(
        error.to_string().contains("ca_threshold"),
        "Error message should mention the threshold: {error}"
    );
}

#[test]
fn test_empty_pattern() {
    let result = parse_test_config("pattern: \"  \"\n");
    assert!(result.is_err(), "Empty pattern should fail validation");
}

#[test]
fn test_loader_kinds_and_timeout() {
    let config = parse_test_config("data_loader: summary\nfetch_timeout_secs: 5\n").unwrap();
    assert_eq!(config.data_loader, DataLoaderKind::Summary);
    assert_eq!(config.fetch_timeout().as_secs(), 5);
    assert!(matches!(
        config.data_loader.backend(config.fetch_timeout()),
        Ok(DataBackend::Summary(_))
    ));

    let config = parse_test_config("data_loader: local\n").unwrap();
    assert!(matches!(
        config.data_loader.backend(config.fetch_timeout()),
        Ok(DataBackend::Loader(_))
    ));

    let result = parse_test_config("fetch_timeout_secs: 0\n");
    assert!(result.is_err(), "A zero timeout should fail validation");
}

#[test]
fn test_unknown_data_loader() {
    let result = parse_test_config("data_loader: remote\n");
    assert!(result.is_err(), "Unknown loader should fail to parse");
}

#[test]
fn test_invalid_yaml_syntax() {
    let result = parse_test_config("submissions: [\"/srv\"\n");
    assert!(result.is_err());
    assert!(
        result
            .err()
            .unwrap()
            .to_string()
            .contains("Please check the YAML syntax"),
        "Error should point at the YAML syntax"
    );
}

#[test]
fn test_missing_submission_paths_are_checked() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("grader.yaml");
    fs::write(
        &config_path,
        format!(
            "submissions:\n  - \"{}\"\n",
            temp_dir.path().join("missing").display()
        ),
    )
    .unwrap();

    assert!(load_config(&config_path, false).is_ok());
    assert!(load_config(&config_path, true).is_err());
}

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = tempdir().unwrap();
    let config = read_or_default(&temp_dir.path().join("nothing.yaml"), true)
        .expect("Missing configuration should fall back to defaults");

    assert_eq!(config, Config::default());
}
