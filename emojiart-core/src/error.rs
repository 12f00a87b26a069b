//! Error types for document model operations.

use thiserror::Error;

/// Result type for document model operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the document model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The bytes are not a well-formed document of the expected shape.
    #[error("Decoding error: {0}")]
    Decoding(#[from] serde_json::Error),

    /// An I/O error occurred while reading a document file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
