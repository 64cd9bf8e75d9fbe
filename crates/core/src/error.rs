//! Error types for file conversion.

use crate::preset::OutputType;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the file-converter library.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The preset is missing or internally inconsistent.
    #[error("Invalid conversion preset: {0}")]
    InvalidPreset(String),

    /// The selected strategy cannot produce the requested output type.
    #[error("Output format {output} is not supported by the {strategy} conversion")]
    UnsupportedOutputFormat {
        output: OutputType,
        strategy: &'static str,
    },

    /// The input document could not be read or parsed.
    #[error("Failed to open '{path}': {message}")]
    DocumentOpenFailure { path: PathBuf, message: String },

    /// Encoding or writing the output failed.
    #[error("Failed to encode '{path}': {message}")]
    EncodeFailure { path: PathBuf, message: String },

    /// An external conversion tool is not installed.
    #[error("{0} not found. Please install it and ensure it is in PATH")]
    EngineNotFound(&'static str),

    /// An external conversion tool ran but reported failure.
    #[error("{tool} failed: {message}")]
    EngineFailed { tool: &'static str, message: String },

    /// An external conversion tool did not finish in time.
    #[error("{tool} timed out after {timeout_secs} seconds for '{path}'")]
    Timeout {
        tool: &'static str,
        path: PathBuf,
        timeout_secs: u64,
    },

    /// Output directory creation failed.
    #[error("Failed to create output directory '{path}': {message}")]
    OutputDirError { path: PathBuf, message: String },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid converter configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle operation was called in the wrong state.
    #[error("Cannot {operation} a job in state {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::job::ConversionState,
    },

    /// The job was canceled before it completed.
    #[error("Conversion canceled")]
    Canceled,
}

impl ConversionError {
    /// Whether this error was raised by preset or configuration validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConversionError::InvalidPreset(_) | ConversionError::UnsupportedOutputFormat { .. }
        )
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ConversionState;

    #[test]
    fn test_error_display_invalid_preset() {
        let err = ConversionError::InvalidPreset("no preset".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid conversion preset"));
        assert!(msg.contains("no preset"));
    }

    #[test]
    fn test_error_display_unsupported_output() {
        let err = ConversionError::UnsupportedOutputFormat {
            output: OutputType::Mp3,
            strategy: "vector rasterize",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Mp3"));
        assert!(msg.contains("vector rasterize"));
    }

    #[test]
    fn test_error_display_document_open_failure() {
        let err = ConversionError::DocumentOpenFailure {
            path: PathBuf::from("/path/to/drawing.svg"),
            message: "unexpected end of stream".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("/path/to/drawing.svg"));
        assert!(msg.contains("unexpected end of stream"));
    }

    #[test]
    fn test_error_display_engine_not_found() {
        let err = ConversionError::EngineNotFound("FFmpeg");
        let msg = format!("{}", err);
        assert!(msg.contains("FFmpeg not found"));
        assert!(msg.contains("PATH"));
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = ConversionError::InvalidState {
            operation: "convert",
            state: ConversionState::Done,
        };
        assert_eq!(format!("{}", err), "Cannot convert a job in state Done");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConversionError = io_err.into();
        match err {
            ConversionError::Io(_) => (),
            _ => panic!("Expected Io"),
        }
    }

    #[test]
    fn test_is_validation() {
        assert!(ConversionError::InvalidPreset("x".into()).is_validation());
        assert!(ConversionError::UnsupportedOutputFormat {
            output: OutputType::Pdf,
            strategy: "media",
        }
        .is_validation());
        assert!(!ConversionError::Canceled.is_validation());
    }
}
