/*!
 * Error types for the danmu2ass application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur while fetching comments from a comment source
#[derive(Error, Debug)]
pub enum FetchError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message or response body excerpt
        message: String,
    },

    /// The response parsed but carried no danmaku payload
    #[error("API response contains no danmaku data for video {0}")]
    MissingData(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::MissingData(_) => false,
        }
    }
}

/// Errors raised while assembling or merging subtitle documents
#[derive(Error, Debug, PartialEq)]
pub enum DocumentError {
    /// The existing document does not have the expected ASS structure
    #[error("Malformed document at line {line}: {reason}")]
    Malformed {
        /// 1-based line number of the offending line (0 for whole-document issues)
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A cue references a style that the document does not define
    #[error("Cue references undefined style '{style}'")]
    DanglingStyle {
        /// The missing style name
        style: String,
    },

    /// Two styles of an assembled document share a name
    #[error("Style '{style}' is defined more than once")]
    DuplicateStyle { style: String },
}

impl DocumentError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The content reference is neither a numeric id nor a URL carrying one
    #[error("Invalid content reference: {0}")]
    InvalidReference(String),

    /// Error from the comment source
    #[error("Fetching danmaku failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// Missing or invalid configuration option
    #[error("Malformed configuration: {0}")]
    MalformedConfiguration(String),

    /// Merge target or assembled document is inconsistent
    #[error("Malformed document: {0}")]
    MalformedDocument(#[from] DocumentError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
