//! Error types for the triage crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by configuration loading, the JSONL boundary, and validation.
///
/// Classification misses are not errors: an unrecognized failure resolves to the
/// catch-all category instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, detected before any record is read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value failed a structural check.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The input source is missing or unreadable as a whole.
    #[error("Input error: {0}")]
    Input(String),

    /// A single input line could not be turned into a record.
    #[error("Malformed record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}
