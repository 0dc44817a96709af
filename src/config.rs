//! Run configuration
//!
//! A `RunConfig` is built once (from the command line or in code) before any
//! scenario runs and is only ever read afterwards.

use crate::error::{BenchError, Result};
use dbbench_core::{DurabilityMode, StoreOptions, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use dbbench_engine::wal::MAX_FRAME_LEN;
use std::path::PathBuf;

/// Scenarios run when none are given
///
///   fillseq        -- write N values in sequential key order
///   fillseqsync    -- write N/100 values in sequential key order, fsync per commit
///   fillseqbatch   -- write N values in sequential key order, 1000 per transaction
///   fillrandom     -- write N values in random key order
///   fillrandsync   -- write N/100 values in random key order, fsync per commit
///   fillrandbatch  -- write N values in random key order, 1000 per transaction
///   overwrite      -- overwrite N values in random key order
///   overwritebatch -- overwrite N values in random key order, 1000 per transaction
///   readrandom     -- read N times in random order
///   readseq        -- read N times sequentially with a cursor
///   fillrand100K   -- write N/1000 100K values in random order
///   fillseq100K    -- write N/1000 100K values in sequential order
///   readseq100K    -- read N/1000 values in sequential order
///   readrand100K   -- read N/1000 values in random order
pub const DEFAULT_BENCHMARKS: &str = "fillseq,\
fillseqsync,\
fillseqbatch,\
fillrandom,\
fillrandsync,\
fillrandbatch,\
overwrite,\
overwritebatch,\
readrandom,\
readseq,\
fillrand100K,\
fillseq100K,\
readseq100K,\
readrand100K,";

/// Pages of logical payload written between harness-driven checkpoints
pub const DEFAULT_CHECKPOINT_PAGES: u64 = 8;

/// Largest accepted value size
///
/// One put is logged as one frame, which also carries the key and the record
/// header, so values stop 1 KiB short of the frame limit.
pub const MAX_VALUE_SIZE: usize = MAX_FRAME_LEN - 1024;

/// Benchmark run settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Comma-separated scenario list, run in order
    pub benchmarks: String,
    /// Number of key/values to place in the store
    pub num: u64,
    /// Number of read operations; `None` means `num`
    pub reads: Option<u64>,
    /// Size of each value in bytes
    pub value_size: usize,
    /// Record and print per-operation latency histograms
    pub histogram: bool,
    /// Fraction of its original size a value shrinks to under compression
    pub compression_ratio: f64,
    /// Keep the existing store; fresh-store scenarios are skipped
    pub use_existing_db: bool,
    /// Store page size in bytes
    pub page_size: usize,
    /// Cache budget in pages
    pub num_pages: usize,
    /// Durability of the store opened at the start of the run
    pub durability: DurabilityMode,
    /// Directory holding the benchmark stores
    pub db: PathBuf,
    /// Pages of payload between checkpoints issued by the harness
    pub checkpoint_pages: u64,
    /// Print progress lines to stderr
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            benchmarks: DEFAULT_BENCHMARKS.to_string(),
            num: 1_000_000,
            reads: None,
            value_size: 100,
            histogram: false,
            compression_ratio: 0.5,
            use_existing_db: false,
            page_size: DEFAULT_PAGE_SIZE,
            num_pages: 1024,
            durability: DurabilityMode::Off,
            db: default_db_path(),
            checkpoint_pages: DEFAULT_CHECKPOINT_PAGES,
            progress: true,
        }
    }
}

/// `<temp dir>/dbbench`
pub fn default_db_path() -> PathBuf {
    std::env::temp_dir().join("dbbench")
}

impl RunConfig {
    /// Number of reads the read scenarios perform
    pub fn read_count(&self) -> u64 {
        self.reads.unwrap_or(self.num)
    }

    /// Cache budget in bytes
    pub fn cache_size(&self) -> usize {
        self.num_pages.saturating_mul(self.page_size)
    }

    /// Store options for a store opened with `durability`
    pub fn store_options(&self, durability: DurabilityMode) -> StoreOptions {
        StoreOptions {
            durability,
            cache_size: self.cache_size(),
            page_size: self.page_size,
            ..StoreOptions::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two()
            || self.page_size < MIN_PAGE_SIZE
            || self.page_size > MAX_PAGE_SIZE
        {
            return Err(BenchError::config(format!(
                "page_size {} must be a power of two in [{}, {}]",
                self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        if self.compression_ratio.is_nan() || self.compression_ratio <= 0.0 {
            return Err(BenchError::config(format!(
                "compression_ratio {} must be positive",
                self.compression_ratio
            )));
        }
        if self.value_size > MAX_VALUE_SIZE {
            return Err(BenchError::config(format!(
                "value_size {} exceeds the {} byte limit",
                self.value_size, MAX_VALUE_SIZE
            )));
        }
        if self.num_pages == 0 {
            return Err(BenchError::config("num_pages must be at least 1"));
        }
        if self.checkpoint_pages == 0 {
            return Err(BenchError::config("checkpoint_pages must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_default_to_num() {
        let config = RunConfig {
            num: 500,
            ..Default::default()
        };
        assert_eq!(config.read_count(), 500);

        let config = RunConfig {
            num: 500,
            reads: Some(20),
            ..Default::default()
        };
        assert_eq!(config.read_count(), 20);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_size(), 4 * 1024 * 1024);
        assert!(config.db.ends_with("dbbench"));
    }

    #[test]
    fn test_store_options_follow_config() {
        let config = RunConfig {
            page_size: 8192,
            num_pages: 16,
            ..Default::default()
        };
        let opts = config.store_options(DurabilityMode::Full);
        assert_eq!(opts.page_size, 8192);
        assert_eq!(opts.cache_size, 8192 * 16);
        assert_eq!(opts.durability, DurabilityMode::Full);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_value_size_limit_is_inclusive() {
        let config = RunConfig {
            value_size: MAX_VALUE_SIZE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            RunConfig {
                page_size: 4000,
                ..Default::default()
            },
            RunConfig {
                compression_ratio: 0.0,
                ..Default::default()
            },
            RunConfig {
                compression_ratio: f64::NAN,
                ..Default::default()
            },
            RunConfig {
                num_pages: 0,
                ..Default::default()
            },
            RunConfig {
                checkpoint_pages: 0,
                ..Default::default()
            },
            RunConfig {
                value_size: 70_000_000,
                ..Default::default()
            },
            RunConfig {
                value_size: MAX_VALUE_SIZE + 1,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(BenchError::Config(_))));
        }
    }
}
