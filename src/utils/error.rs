//! Error handling for the generator

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Generator error
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ==================== Parser Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Malformed declaration: {reason}")]
    MalformedDeclaration { reason: String, span: Span },

    // ==================== Input Shape Errors ====================

    #[error("Table `{name}` not found in header")]
    MissingTable { name: String },

    #[error("Enum `{name}` not found")]
    MissingEnum { name: String },

    #[error("Array `{name}` not found")]
    MissingArray { name: String },

    // ==================== Validation Errors ====================

    #[error("Ham catalogue mismatch: {message}")]
    CatalogueMismatch { message: String },

    // ==================== Environment ====================

    #[error("IO error: {0}")]
    Io(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::MalformedDeclaration { span, .. } => Some(*span),
            Self::MissingTable { .. }
            | Self::MissingEnum { .. }
            | Self::MissingArray { .. }
            | Self::CatalogueMismatch { .. }
            | Self::Io(_)
            | Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
