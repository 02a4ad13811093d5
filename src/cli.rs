use std::path::PathBuf;

use atty::Stream;
use clap::{
    Arg, ArgAction, ArgMatches, Command, command, crate_authors, crate_description, crate_name,
    crate_version, value_parser,
};

use crate::constants::{
    CONFIG_HELP, DEFAULT_CONFIG_PATH, JSON_HELP, LOCAL_LOGGING_HELP, LOG_FILE_DEFAULT,
    LOG_FILE_HELP, NO_DATA_HELP, PATHS_HELP, THRESHOLD_HELP, VERBOSE_HELP,
};
use crate::errors::{Result, generic_error};
use crate::logging::LogLevel;
use crate::utils::find_project_folder;
use crate::workflow::GradingOptions;

/// Checks if stdout is a terminal and waits for user input if it is
///
/// Keeps the console window open when the program is started from a GUI.
pub fn check_for_stdout_stream() {
    if atty::is(Stream::Stdout) {
        dont_disappear::enter_to_continue::default();
    }
}

/// Builds the command-line interface
///
/// Defines the following arguments:
/// - `paths`: workflow files or directories to grade
/// - `config`: path to the configuration file
/// - `threshold`: minimum accepted accuracy
/// - `no_data`: skip data source loading
/// - `json`: machine-readable output
/// - `verbose`, `log_file`, `log_locally`: logging
pub fn build_command() -> Command {
    let arg_paths = Arg::new("paths")
        .help(PATHS_HELP)
        .num_args(0..)
        .value_parser(value_parser!(PathBuf));

    let arg_config = Arg::new("config")
        .short('c')
        .long("config")
        .help(CONFIG_HELP)
        .default_value(DEFAULT_CONFIG_PATH);

    let arg_threshold = Arg::new("threshold")
        .short('t')
        .long("threshold")
        .help(THRESHOLD_HELP)
        .value_parser(value_parser!(f64));

    let arg_no_data = Arg::new("no_data")
        .long("no-data")
        .help(NO_DATA_HELP)
        .action(ArgAction::SetTrue);

    let arg_json = Arg::new("json")
        .long("json")
        .help(JSON_HELP)
        .action(ArgAction::SetTrue);

    let arg_verbose = Arg::new("verbose")
        .short('v')
        .long("verbose")
        .help(VERBOSE_HELP)
        .action(ArgAction::Count);

    let log_file = Arg::new("log_file")
        .short('l')
        .long("log-file")
        .help(LOG_FILE_HELP);

    let log_locally = Arg::new("log_locally")
        .short('L')
        .long("log-locally")
        .help(LOCAL_LOGGING_HELP)
        .action(ArgAction::SetTrue);

    command!()
        .author(crate_authors!())
        .about(crate_description!())
        .name(crate_name!())
        .version(crate_version!())
        .arg(arg_paths)
        .arg(arg_config)
        .arg(arg_threshold)
        .arg(arg_no_data)
        .arg(arg_json)
        .arg(log_file)
        .arg(log_locally)
        .arg(arg_verbose)
}

/// Parses the process arguments
pub fn get_matches() -> ArgMatches {
    build_command().get_matches()
}

/// Gets the verbosity level from the number of -v/--verbose flags
pub fn get_verbosity(matches: &ArgMatches) -> LogLevel {
    let verbose_count = matches.get_count("verbose");
    LogLevel::from_occurrences(verbose_count)
}

/// Resolves the log file path
///
/// An empty name disables file logging. Unless `--log-locally` is given the
/// file lives in the platform configuration directory.
pub fn get_log_file(matches: &ArgMatches) -> Result<String> {
    let filename = matches
        .get_one::<String>("log_file")
        .cloned()
        .unwrap_or_else(|| LOG_FILE_DEFAULT.to_string());
    if filename.is_empty() || matches.get_flag("log_locally") {
        Ok(filename)
    } else {
        let folder = find_project_folder()?;
        let path = folder.config_dir().join(filename);
        let path_str = path
            .to_str()
            .ok_or_else(|| generic_error(&format!("Failed to convert path to string: {path:?}")))?;
        Ok(path_str.to_string())
    }
}

/// Whether the report should be printed as JSON
pub fn wants_json(matches: &ArgMatches) -> bool {
    matches.get_flag("json")
}

/// Collects the grading options from the command line
pub fn get_grading_options(matches: &ArgMatches) -> GradingOptions {
    GradingOptions {
        config_path: matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        paths: matches
            .get_many::<PathBuf>("paths")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default(),
        ca_threshold: matches.get_one::<f64>("threshold").copied(),
        no_data: matches.get_flag("no_data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grading_options_from_arguments() {
        let matches = build_command().get_matches_from([
            "owsgrade",
            "inbox",
            "30101 Kim.ows",
            "-t",
            "0.75",
            "--no-data",
            "-c",
            "week3.yaml",
        ]);
        let options = get_grading_options(&matches);

        assert_eq!(
            options.paths,
            vec![PathBuf::from("inbox"), PathBuf::from("30101 Kim.ows")]
        );
        assert_eq!(options.ca_threshold, Some(0.75));
        assert!(options.no_data);
        assert_eq!(options.config_path, PathBuf::from("week3.yaml"));
        assert!(!wants_json(&matches));
    }

    #[test]
    fn test_defaults() {
        let matches = build_command().get_matches_from(["owsgrade", "-vv", "--json"]);
        let options = get_grading_options(&matches);

        assert!(options.paths.is_empty());
        assert_eq!(options.ca_threshold, None);
        assert_eq!(options.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(get_verbosity(&matches), LogLevel::Trace);
        assert!(wants_json(&matches));
        assert_eq!(get_log_file(&matches).unwrap(), "");
    }
}
