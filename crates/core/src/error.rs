//! Error types for the strata segment store
//!
//! This module defines the error type shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for segment store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the segment store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the storage layer, propagated unchanged
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid construction parameter (chunk size, block size, rank power...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller broke an input contract (out-of-order docs, wrong value count...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Document id outside `[0, max_doc)`
    #[error("Document {doc_id} out of range (max_doc={max_doc})")]
    DocOutOfRange {
        /// Requested document id
        doc_id: u64,
        /// Number of documents in the store
        max_doc: u64,
    },

    /// Ordinal outside `[0, size)`
    #[error("Ordinal {ord} out of range (size={size})")]
    OrdOutOfRange {
        /// Requested ordinal
        ord: u64,
        /// Number of values
        size: u64,
    },

    /// Persisted data failed an integrity check
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Operation is not available on this value source
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Compression or decompression failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Header serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Returns true for errors that indicate damaged persisted data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::Codec(_))
    }
}
