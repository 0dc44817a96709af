//! Store engine for dbbench
//!
//! This crate provides:
//! - The store contract the benchmark drives (`Store`, `ReadTransaction`,
//!   `WriteTransaction`, `Cursor`)
//! - LogStore: a file-backed reference store (ordered containers, write-ahead
//!   log, checkpointing into a primary store file)
//! - WAL framing and recovery replay

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log_store;
pub mod traits;
pub mod wal;

pub use log_store::{LogStore, StoreMetrics, PROPERTY_STATS, PROPERTY_STATS_JSON};
pub use traits::{Cursor, ReadTransaction, Store, WriteTransaction};
