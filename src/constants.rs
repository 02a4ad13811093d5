/// Constants used throughout the application
///
/// This module centralises all constants used in the application to make
/// them easier to manage and update.

/// Qualifier string used for application identification
pub const QUALIFIER: &str = "com";

/// Organisation name used for application identification
pub const ORGANIZATION: &str = "ows_grade";

/// Application name used for identification
///
/// Used for the platform configuration directory and log file location.
pub const APPLICATION: &str = "ows_grade";

/// Help text for the paths positional argument
pub const PATHS_HELP: &str =
    "Workflow files or directories to grade (overrides `submissions` from the config)";

/// Help text for the config command-line option
pub const CONFIG_HELP: &str = "Read from a specific config file";

/// Help text for the threshold command-line option
pub const THRESHOLD_HELP: &str = "Minimum classification accuracy (CA) accepted by criterion 5-1";

/// Help text for the no-data command-line option
pub const NO_DATA_HELP: &str = "Do not try to load data sources (criterion 1-2 always fails)";

/// Help text for the json command-line option
pub const JSON_HELP: &str = "Print the report as JSON";

/// Help text for the verbose command-line option
pub const VERBOSE_HELP: &str = "Increase verbosity level (can be used multiple times)";

/// Help text for the log file command-line option
pub const LOG_FILE_HELP: &str = "Write log output to this file as well";

/// Help text for the local logging command-line option
pub const LOCAL_LOGGING_HELP: &str =
    "Keep the log file in the current directory instead of the config directory";

/// Default log file name, empty means no file sink
pub const LOG_FILE_DEFAULT: &str = "";

/// Default path for the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "grader.yaml";

/// Default glob applied inside submission directories
pub const DEFAULT_PATTERN: &str = "*.ows";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
