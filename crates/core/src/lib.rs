//! Core types for dbbench
//!
//! This crate defines the types shared by the store and the benchmark harness:
//! - Error: Error type returned by every store operation
//! - StoreOptions: Durability, locking, cache and page settings used at open
//! - ContainerId: Handle to a named container

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;

pub use error::{Error, Result};
pub use options::{
    ContainerId, DurabilityMode, LockMode, StoreOptions, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
    MIN_PAGE_SIZE,
};
