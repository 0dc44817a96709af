//! Error types for the benchmark harness

use std::io;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a benchmark run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Malformed or out-of-range configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Non-success status from the store
    #[error("status = {0}")]
    Engine(#[from] dbbench_core::Error),

    /// Failure writing benchmark output or preparing the store directory
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A scenario ran before any store was opened
    #[error("no store is open")]
    NotOpen,
}

impl BenchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BenchError::Config(msg.into())
    }
}
