//! Error types for dbbench
//!
//! This module defines the error type shared by the engine and the harness.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types returned by a store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, locking, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Key not found in a container
    ///
    /// Point lookups report absence through this variant. Callers that treat
    /// absence as normal should check [`Error::is_not_found`].
    #[error("Not found")]
    NotFound,

    /// Container has never been created in this store
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Data corruption detected
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid option or argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Store is locked by another handle
    #[error("Busy: {0}")]
    Busy(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Check whether this error reports a missing key
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
