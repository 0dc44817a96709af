//! dbbench: throughput and latency benchmarks for transactional key-value stores
//!
//! The harness drives a [`Store`](dbbench_engine::Store) through a list of
//! named scenarios and prints one summary line per scenario:
//!
//! ```text
//! fillseq      :       2.941 micros/op;   37.6 MB/s
//! readrandom   :       1.120 micros/op;   98.7 MB/s
//! ```
//!
//! # Components
//!
//! - [`data`]: reusable compressible value bytes
//! - [`keys`]: sequential and seeded random key order, 16-digit key encoding
//! - [`checkpoint`]: byte-count driven checkpoint policy for write workloads
//! - [`histogram`] and [`instrumentation`]: per-op latency, progress, MB/s
//! - [`workload`]: write, point-read and scan executors
//! - [`scenario`] and [`benchmark`]: the scenario table and the run loop
//!
//! # Example
//!
//! ```ignore
//! use dbbench::{Benchmark, RunConfig};
//! use dbbench_engine::LogStore;
//!
//! let config = RunConfig {
//!     benchmarks: "fillseq,readrandom".into(),
//!     num: 10_000,
//!     ..Default::default()
//! };
//! let mut bench = Benchmark::<LogStore, _>::new(&config, std::io::stdout())?;
//! bench.run()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod benchmark;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod data;
pub mod env;
pub mod error;
pub mod histogram;
pub mod instrumentation;
pub mod keys;
pub mod scenario;
pub mod workload;

pub use benchmark::Benchmark;
pub use checkpoint::CheckpointPolicy;
pub use config::RunConfig;
pub use data::CompressibleDataPool;
pub use error::{BenchError, Result};
pub use histogram::Histogram;
pub use instrumentation::{Instrumentation, ScenarioReport};
pub use keys::{encode_key, KeyGenerator, KeyOrder};
pub use scenario::{parse_scenarios, Scenario, ScenarioEntry};
