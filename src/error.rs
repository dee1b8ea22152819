//! Error types for the office-pdf-merge library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the office-pdf-merge library
#[derive(Error, Debug)]
pub enum Error {
    /// Converter binary could not be found or started
    #[error(
        "Office converter not found (looked for: {}). Install LibreOffice or pass --converter <PATH>.",
        .searched.join(", ")
    )]
    ExternalToolMissing { searched: Vec<String> },

    /// Input extension is not one the converter is asked to handle
    #[error("Unsupported document format '.{extension}': {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Converter exited badly, produced nothing, or timed out
    #[error("Conversion of {} failed: {reason}", .path.display())]
    ConversionFailed { path: PathBuf, reason: String },

    /// Missing, non-PDF or corrupted merge input
    #[error("Cannot read PDF {}: {detail}", .path.display())]
    PdfUnreadable { path: PathBuf, detail: String },

    /// Merge called with nothing to merge
    #[error("No input files provided")]
    EmptyInputSet,

    /// Merged document could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Output filename rejected
    #[error("Invalid output filename: {0}")]
    InvalidOutputName(String),

    /// Run stopped by the user
    #[error("Operation cancelled")]
    Cancelled,

    /// Interactive front end failed or was aborted
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Error::PdfUnreadable {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn conversion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ConversionFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_missing_lists_searched_names() {
        let e = Error::ExternalToolMissing {
            searched: vec!["soffice".into(), "libreoffice".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("soffice, libreoffice"), "got: {msg}");
    }

    #[test]
    fn test_conversion_failed_carries_path_and_reason() {
        let e = Error::conversion("/tmp/deck.pptx", "timed out after 5s");
        let msg = e.to_string();
        assert!(msg.contains("deck.pptx"));
        assert!(msg.contains("timed out after 5s"));
    }
}
