//! Scenario dispatcher
//!
//! [`Benchmark`] owns the open store, the key and value generators and the
//! instrumentation. [`Benchmark::run`] opens the first store, walks the
//! scenario list in order and writes one summary per known scenario.
//!
//! Stores live under the configured root as `dbbench-<n>`, where `n` counts
//! opens. Fresh-store scenarios close the current store and open the next one.

use crate::checkpoint::CheckpointPolicy;
use crate::config::RunConfig;
use crate::data::CompressibleDataPool;
use crate::error::{BenchError, Result};
use crate::instrumentation::{Instrumentation, ScenarioReport};
use crate::keys::{KeyGenerator, KeyOrder};
use crate::scenario::{
    parse_scenarios, Freshness, Scenario, ScenarioEntry, Workload, WriteSpec, LARGE_VALUE_SIZE,
};
use crate::workload::{Executor, WriteOp, CONTAINER_NAME};
use dbbench_core::DurabilityMode;
use dbbench_engine::{Store, PROPERTY_STATS};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of every store directory the harness creates
pub const STORE_PREFIX: &str = "dbbench-";

/// Message of a fresh-store scenario skipped because the store is reused
pub const SKIP_MESSAGE: &str = "skipping (--use_existing_db is true)";

/// Benchmark driver over a store type `S`, writing summaries to `W`
pub struct Benchmark<'c, S: Store, W: Write> {
    config: &'c RunConfig,
    out: W,
    store: Option<S>,
    store_num: u32,
    reads: u64,
    inst: Instrumentation,
    keys: KeyGenerator,
    pool: CompressibleDataPool,
}

impl<'c, S: Store, W: Write> Benchmark<'c, S, W> {
    /// Prepare a run
    ///
    /// Creates the store root and, unless the existing store is reused,
    /// removes stores left by earlier runs.
    pub fn new(config: &'c RunConfig, out: W) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.db)?;
        if !config.use_existing_db {
            remove_stale_stores(&config.db)?;
        }

        Ok(Self {
            config,
            out,
            store: None,
            store_num: 0,
            reads: config.read_count(),
            inst: Instrumentation::new(config.histogram, config.progress),
            keys: KeyGenerator::default(),
            pool: CompressibleDataPool::new(
                config.compression_ratio,
                config.value_size.max(LARGE_VALUE_SIZE),
            ),
        })
    }

    /// The open store, if any
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Directory of the currently open store
    pub fn store_path(&self) -> PathBuf {
        self.config
            .db
            .join(format!("{}{}", STORE_PREFIX, self.store_num))
    }

    /// Read count used by read scenarios (before per-scenario scaling)
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Consume the driver, returning the output sink
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every scenario in the configured list
    pub fn run(&mut self) -> Result<Vec<ScenarioReport>> {
        self.open(self.config.durability)?;

        let mut reports = Vec::new();
        for entry in parse_scenarios(&self.config.benchmarks) {
            let scenario = match entry {
                ScenarioEntry::Known(scenario) => scenario,
                ScenarioEntry::Unknown(unknown) => {
                    eprintln!("{}", unknown);
                    continue;
                }
            };

            debug!(scenario = scenario.name(), "Scenario started");
            self.inst.start();
            self.run_scenario(scenario)?;
            let report = self.inst.stop(scenario.name());
            debug!(
                scenario = scenario.name(),
                ops = report.ops,
                bytes = report.bytes,
                "Scenario finished"
            );

            write!(self.out, "{}", report)?;
            self.out.flush()?;
            reports.push(report);
        }
        Ok(reports)
    }

    fn run_scenario(&mut self, scenario: Scenario) -> Result<()> {
        match scenario.workload() {
            Workload::Write(spec) => self.write(&spec),
            Workload::Read {
                order,
                batch,
                divisor,
            } => self.read(order, self.reads / divisor, batch),
            Workload::Scan => {
                let reads = self.reads;
                let (store, parts) = self.parts()?;
                Executor::new(store, parts.inst, parts.keys, parts.pool).scan(reads)?;
                Ok(())
            }
            Workload::Stats => self.print_stats(),
        }
    }

    fn write(&mut self, spec: &WriteSpec) -> Result<()> {
        if spec.freshness == Freshness::Fresh && self.config.use_existing_db {
            self.inst.set_message(SKIP_MESSAGE);
        } else {
            if spec.freshness == Freshness::Fresh {
                self.open(spec.durability)?;
                self.inst.start();
            }

            let entries = spec.entries.apply(self.config.num);
            if entries != self.config.num {
                self.inst.set_message(format!("({} ops)", entries));
            }

            let op = WriteOp {
                order: spec.order,
                entries,
                value_size: spec.value_size.resolve(self.config.value_size),
                batch: spec.batch,
            };
            let mut policy = CheckpointPolicy::new(
                self.config.page_size,
                self.config.checkpoint_pages,
                self.inst.bytes(),
            );
            let (store, parts) = self.parts()?;
            Executor::new(store, parts.inst, parts.keys, parts.pool).write(&op, &mut policy)?;
        }

        self.handle()?.checkpoint(true)?;
        Ok(())
    }

    fn read(&mut self, order: KeyOrder, reads: u64, batch: u64) -> Result<()> {
        let (store, parts) = self.parts()?;
        Executor::new(store, parts.inst, parts.keys, parts.pool).read(order, reads, batch)?;
        Ok(())
    }

    fn print_stats(&mut self) -> Result<()> {
        let stats = self
            .handle()?
            .property(PROPERTY_STATS)
            .unwrap_or_else(|| "(failed)".to_string());
        writeln!(self.out, "\n{}", stats)?;
        Ok(())
    }

    /// Close the current store and open the next numbered one
    fn open(&mut self, durability: DurabilityMode) -> Result<()> {
        self.store = None;
        self.store_num += 1;

        let path = self.store_path();
        let store = S::open(&self.config.store_options(durability), &path)?;
        store.update(|tx| tx.create_container(CONTAINER_NAME).map(|_| ()))?;
        debug!(
            path = %path.display(),
            durability = durability.as_str(),
            "Opened benchmark store"
        );
        self.store = Some(store);
        Ok(())
    }

    fn handle(&self) -> Result<&S> {
        self.store.as_ref().ok_or(BenchError::NotOpen)
    }

    /// Split the borrow of `self` into the store and the executor state
    fn parts(&mut self) -> Result<(&S, Parts<'_>)> {
        let store = self.store.as_ref().ok_or(BenchError::NotOpen)?;
        Ok((
            store,
            Parts {
                inst: &mut self.inst,
                keys: &mut self.keys,
                pool: &mut self.pool,
            },
        ))
    }
}

/// Mutable executor state borrowed from a [`Benchmark`]
struct Parts<'a> {
    inst: &'a mut Instrumentation,
    keys: &'a mut KeyGenerator,
    pool: &'a mut CompressibleDataPool,
}

/// Remove `dbbench-*` entries under `root`
fn remove_stale_stores(root: &Path) -> io::Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(STORE_PREFIX) {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!(path = %path.display(), "Removed stale store");
    }
    Ok(())
}
