use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for weft operations
#[derive(Error, Debug)]
pub enum WeftError {
    /// A token survived substitution while rendering in strict mode
    #[error("Variable not found in data: {name}")]
    MissingVariable { name: String },

    /// A delimiter pair cannot be used to build token patterns
    #[error("Malformed {role} delimiter configuration: {message}")]
    MalformedDelimiterConfig { role: &'static str, message: String },

    /// A loop body is indented less than the loop tag it belongs to
    #[error(
        "Loop '{variable}' body is indented by {indent} columns, less than its tag offset of {offset}"
    )]
    ReindentUnderflow {
        variable: String,
        offset: usize,
        indent: usize,
    },

    /// The configured key column is absent from the sheet's header row
    #[error("Key column not found: {column}")]
    KeyColumnNotFound { column: String },

    /// Variables have a shape the requested output mode cannot use
    #[error("Invalid variables: {message}")]
    InvalidVariables { message: String },

    /// Variable source with an extension the loader does not understand
    #[error("Unsupported variables format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Named template does not exist in the template directory
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// Path traversal security error
    #[error("Path traversal detected (trying to access files outside template directory): {path}")]
    PathTraversal { path: PathBuf },

    /// IO error when reading templates or writing output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet parsing error
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    /// Malformed JSONPath filter expression
    #[error("JSONPath error: {0}")]
    JsonPath(#[from] serde_json_path::ParseError),

    /// `WalkDir` error when traversing template directories
    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Invalid exclude glob
    #[error("Glob error: {0}")]
    Glob(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WeftError::MissingVariable {
            name: "missing".to_string(),
        };
        assert_eq!(format!("{err}"), "Variable not found in data: missing");

        let err = WeftError::MalformedDelimiterConfig {
            role: "loop block",
            message: "contains a line break".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Malformed loop block delimiter configuration: contains a line break"
        );

        let err = WeftError::ReindentUnderflow {
            variable: "items".to_string(),
            offset: 4,
            indent: 2,
        };
        assert!(format!("{err}").contains("'items'"));
        assert!(format!("{err}").contains("offset of 4"));

        let err = WeftError::KeyColumnNotFound {
            column: "key".to_string(),
        };
        assert_eq!(format!("{err}"), "Key column not found: key");

        let err = WeftError::PathTraversal {
            path: PathBuf::from("/etc/passwd"),
        };
        assert!(format!("{err}").contains("Path traversal detected"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: WeftError = io_err.into();
        assert!(matches!(err, WeftError::Io(_)));
    }

    #[test]
    fn test_error_from_json_path() {
        let path_err = serde_json_path::JsonPath::parse("$[").unwrap_err();
        let err: WeftError = path_err.into();
        assert!(matches!(err, WeftError::JsonPath(_)));
        assert!(format!("{err}").starts_with("JSONPath error"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: WeftError = json_err.into();
        assert!(matches!(err, WeftError::Json(_)));
    }
}
