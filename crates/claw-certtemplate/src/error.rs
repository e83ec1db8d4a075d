//! Certificate template error types.

use thiserror::Error;

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Certificate template error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Template rendering failed.
    #[error("template rendering failed: {0}")]
    Render(String),

    /// Parsing failed (rendered descriptor, certificate request or template source).
    #[error("parsing failed: {0}")]
    Parse(String),

    /// A value does not have the shape required by a well-known key.
    #[error("invalid value for key '{key}': {reason}")]
    InvalidValue {
        /// The well-known key that was targeted.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Invalid key usage.
    #[error("invalid key usage: {0}")]
    InvalidKeyUsage(String),

    /// Subject Alternative Name error.
    #[error("SAN error: {0}")]
    San(String),

    /// Reading a template source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Self::Render(err.to_string())
    }
}
