use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Custom error type for the workflow grader
#[derive(Debug)]
pub enum Error {
    /// The workflow file does not exist
    NotFound { path: PathBuf },
    /// The workflow file is not a well-formed XML document
    MalformedDocument { path: PathBuf, detail: String },
    /// Error related to file operations
    FileOperation {
        source: io::Error,
        path: PathBuf,
        operation: String,
    },
    /// A node's saved settings could not be decoded
    PropertyDecoding { node_id: String, detail: String },
    /// Error raised by the literal settings parser
    LiteralSyntax { position: usize, detail: String },
    /// Error raised by the pickle stream decoder
    PickleDecoding { offset: usize, detail: String },
    /// A referenced data source could not be loaded
    DataLoad { source_ref: String, detail: String },
    /// Generic error with a message
    Generic { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { path } => {
                write!(f, "Workflow file not found: {}", path.display())
            }
            Error::MalformedDocument { path, detail } => {
                write!(
                    f,
                    "Malformed workflow document {}: {detail}",
                    path.display()
                )
            }
            Error::FileOperation {
                path, operation, ..
            } => {
                write!(f, "Failed to {} file: {}", operation, path.display())
            }
            Error::PropertyDecoding { node_id, detail } => {
                write!(f, "Cannot decode properties of node '{node_id}': {detail}")
            }
            Error::LiteralSyntax { position, detail } => {
                write!(f, "Invalid literal at position {position}: {detail}")
            }
            Error::PickleDecoding { offset, detail } => {
                write!(f, "Invalid pickle stream at offset {offset}: {detail}")
            }
            Error::DataLoad { source_ref, detail } => {
                write!(f, "Failed to load data from '{source_ref}': {detail}")
            }
            Error::Generic { message } => {
                write!(f, "{message}")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::FileOperation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::FileOperation {
            source: err,
            path: PathBuf::new(),
            operation: "perform operation on".to_string(),
        }
    }
}

/// Custom Result type for the workflow grader
///
/// Used as the return type of the document, value and data layers. Grading
/// predicates never return it: they collapse every failure to `false`.
///
/// # Examples
/// ```
/// use ows_grade::prelude::{Result, generic_error};
///
/// fn example_function() -> Result<String> {
///     // Return success
///     Ok("success".to_string())
///
///     // Or return an error
///     // Err(generic_error("Something went wrong"))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Helper function to create a not-found error
pub fn not_found_error(path: PathBuf) -> Error {
    Error::NotFound { path }
}

/// Helper function to create a malformed document error
pub fn malformed_document_error(path: PathBuf, detail: &str) -> Error {
    Error::MalformedDocument {
        path,
        detail: detail.to_string(),
    }
}

/// Helper function to create a file operation error
pub fn file_operation_error(err: io::Error, path: PathBuf, operation: &str) -> Error {
    Error::FileOperation {
        source: err,
        path,
        operation: operation.to_string(),
    }
}

/// Helper function to create a property decoding error
pub fn property_decoding_error(node_id: &str, detail: &str) -> Error {
    Error::PropertyDecoding {
        node_id: node_id.to_string(),
        detail: detail.to_string(),
    }
}

/// Helper function to create a literal syntax error
pub fn literal_syntax_error(position: usize, detail: &str) -> Error {
    Error::LiteralSyntax {
        position,
        detail: detail.to_string(),
    }
}

/// Helper function to create a pickle decoding error
pub fn pickle_decoding_error(offset: usize, detail: &str) -> Error {
    Error::PickleDecoding {
        offset,
        detail: detail.to_string(),
    }
}

/// Helper function to create a data load error
pub fn data_load_error(source_ref: &str, detail: &str) -> Error {
    Error::DataLoad {
        source_ref: source_ref.to_string(),
        detail: detail.to_string(),
    }
}

/// Helper function to create a generic error
pub fn generic_error(message: &str) -> Error {
    Error::Generic {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = not_found_error(PathBuf::from("/submissions/30101 Kim.ows"));

        let error_string = format!("{error}");
        assert!(
            error_string.contains("/submissions/30101 Kim.ows"),
            "Error message should contain the path"
        );
        assert!(matches!(error, Error::NotFound { .. }));
    }

    #[test]
    fn test_malformed_document_error() {
        let error = malformed_document_error(PathBuf::from("broken.ows"), "unexpected end");

        let error_string = format!("{error}");
        assert!(
            error_string.contains("broken.ows"),
            "Error message should contain the path"
        );
        assert!(
            error_string.contains("unexpected end"),
            "Error message should contain the detail"
        );
    }

    #[test]
    fn test_file_operation_error() {
        let path = PathBuf::from("/test/path");
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = file_operation_error(io_error, path.clone(), "read");

        let error_string = format!("{error}");
        assert!(
            error_string.contains("read"),
            "Error message should contain the operation"
        );
        assert!(
            error_string.contains("/test/path"),
            "Error message should contain the path"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_decoding_errors() {
        let error = property_decoding_error("3", "bad base64");
        assert!(format!("{error}").contains("'3'"));

        let error = literal_syntax_error(12, "unterminated string");
        let error_string = format!("{error}");
        assert!(error_string.contains("12"));
        assert!(error_string.contains("unterminated string"));

        let error = pickle_decoding_error(7, "unknown opcode");
        let error_string = format!("{error}");
        assert!(error_string.contains("offset 7"));
        assert!(error_string.contains("unknown opcode"));
    }

    #[test]
    fn test_data_load_error() {
        let error = data_load_error("https://example.org/iris.tab", "timed out");

        let error_string = format!("{error}");
        assert!(error_string.contains("https://example.org/iris.tab"));
        assert!(error_string.contains("timed out"));
    }

    #[test]
    fn test_generic_error() {
        let error = generic_error("Something went wrong");
        assert_eq!(format!("{error}"), "Something went wrong");
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::Other, "boom");
        let error: Error = io_error.into();
        assert!(
            format!("{error}").contains("Failed to perform operation on file"),
            "Error message should contain the underlying error"
        );
    }
}
