//! LogStore: file-backed reference store with ordered in-memory containers
//!
//! This module implements the [`Store`] contract using:
//! - `BTreeMap<Vec<u8>, Vec<u8>>` per container for ordered key storage
//! - `parking_lot::RwLock` so a write transaction owns the tables for its lifetime
//! - A write-ahead log (`wal.log`) and a primary store file (`store.db`)
//! - An advisory lock file (`LOCK`) through `fs2`
//!
//! # Design Notes
//!
//! - **Single writer**: a read-write transaction holds the write lock from
//!   begin to commit/rollback, so at most one is open at a time
//! - **In-place writes with undo**: puts go straight into the tree; rollback
//!   replays the undo log in reverse
//! - **Checkpoint is a copy**: the store file uses the log's framing, so a
//!   checkpoint appends the log bytes to `store.db` and truncates the log
//! - **No compaction**: `store.db` keeps every committed frame, overwritten
//!   values included

use crate::traits::{Cursor, ReadTransaction, Store, WriteTransaction};
use crate::wal::{self, encode_frame, OwnedRecord, WalRecord, WalWriter};
use dbbench_core::{ContainerId, Error, LockMode, Result, StoreOptions};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{btree_map, BTreeMap};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Write-ahead log file name inside the store directory
pub const WAL_FILE_NAME: &str = "wal.log";
/// Primary store file name inside the store directory
pub const STORE_FILE_NAME: &str = "store.db";
/// Lock file name inside the store directory
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Property returning human-readable store statistics
pub const PROPERTY_STATS: &str = "dbbench.stats";
/// Property returning store statistics as JSON
pub const PROPERTY_STATS_JSON: &str = "dbbench.stats.json";

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Container catalog and data
#[derive(Debug, Default)]
struct Tables {
    names: BTreeMap<String, ContainerId>,
    trees: Vec<Tree>,
}

impl Tables {
    fn lookup(&self, name: &str) -> Result<ContainerId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::ContainerNotFound(name.to_string()))
    }

    /// Returns the id and whether the container was newly created
    fn create(&mut self, name: &str) -> (ContainerId, bool) {
        if let Some(id) = self.names.get(name) {
            return (*id, false);
        }
        let id = ContainerId(self.trees.len() as u32);
        self.names.insert(name.to_string(), id);
        self.trees.push(Tree::new());
        (id, true)
    }

    fn tree(&self, container: ContainerId) -> Result<&Tree> {
        self.trees
            .get(container.index())
            .ok_or_else(|| Error::invalid_argument(format!("unknown container {:?}", container)))
    }

    fn tree_mut(&mut self, container: ContainerId) -> Result<&mut Tree> {
        self.trees
            .get_mut(container.index())
            .ok_or_else(|| Error::invalid_argument(format!("unknown container {:?}", container)))
    }

    fn get(&self, container: ContainerId, key: &[u8]) -> Result<&[u8]> {
        self.tree(container)?
            .get(key)
            .map(Vec::as_slice)
            .ok_or(Error::NotFound)
    }

    fn cursor(&self, container: ContainerId) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(TreeCursor::new(self.tree(container)?)))
    }

    fn record_count(&self) -> usize {
        self.trees.iter().map(BTreeMap::len).sum()
    }

    /// Apply a committed record during recovery
    fn apply(&mut self, record: OwnedRecord) -> Result<()> {
        match record {
            WalRecord::CreateContainer { name } => {
                self.create(&name);
            }
            WalRecord::Put {
                container,
                key,
                value,
            } => {
                self.tree_mut(ContainerId(container))
                    .map_err(|_| {
                        Error::Corruption(format!("put into unknown container {}", container))
                    })?
                    .insert(key.into_owned(), value.into_owned());
            }
            WalRecord::Begin { .. } | WalRecord::Commit { .. } => {}
        }
        Ok(())
    }
}

/// Monotonic store counters
#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    rollbacks: AtomicU64,
    puts: AtomicU64,
    checkpoints: AtomicU64,
    wal_bytes: AtomicU64,
    checkpointed_bytes: AtomicU64,
}

/// Point-in-time copy of the store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetrics {
    /// Committed read-write transactions
    pub commits: u64,
    /// Rolled back read-write transactions
    pub rollbacks: u64,
    /// Puts in committed transactions
    pub puts: u64,
    /// Checkpoints run
    pub checkpoints: u64,
    /// Bytes appended to the write-ahead log
    pub wal_bytes: u64,
    /// Bytes moved from the log into the store file
    pub checkpointed_bytes: u64,
}

#[derive(Debug, Serialize)]
struct StoreStats {
    containers: usize,
    records: usize,
    wal_size: u64,
    store_size: u64,
    page_size: usize,
    cache_size: usize,
    durability: &'static str,
    #[serde(flatten)]
    metrics: StoreMetrics,
}

struct LogFiles {
    wal: WalWriter,
    store: File,
}

/// File-backed ordered key-value store
///
/// Create one with [`Store::open`]. The directory holds the log, the store
/// file and the lock file.
pub struct LogStore {
    dir: PathBuf,
    options: StoreOptions,
    tables: RwLock<Tables>,
    files: Mutex<LogFiles>,
    counters: Counters,
    next_txn_id: AtomicU64,
    _lock: File,
}

impl LogStore {
    /// Directory holding the store files
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Options the store was opened with
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Snapshot of the store counters
    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            commits: self.counters.commits.load(Ordering::Relaxed),
            rollbacks: self.counters.rollbacks.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            checkpoints: self.counters.checkpoints.load(Ordering::Relaxed),
            wal_bytes: self.counters.wal_bytes.load(Ordering::Relaxed),
            checkpointed_bytes: self.counters.checkpointed_bytes.load(Ordering::Relaxed),
        }
    }

    /// Current write-ahead log length in bytes
    pub fn wal_size(&self) -> u64 {
        self.files.lock().wal.len()
    }

    fn stats(&self) -> Result<StoreStats> {
        let (containers, records) = {
            let tables = self.tables.read();
            (tables.names.len(), tables.record_count())
        };
        let (wal_size, store_size) = {
            let files = self.files.lock();
            (files.wal.len(), files.store.metadata()?.len())
        };
        Ok(StoreStats {
            containers,
            records,
            wal_size,
            store_size,
            page_size: self.options.page_size,
            cache_size: self.options.cache_size,
            durability: self.options.durability.as_str(),
            metrics: self.metrics(),
        })
    }

    fn commit(&self, tx: &mut LogWriteTx<'_>) -> Result<()> {
        if tx.undo.is_empty() {
            tx.finished = true;
            return Ok(());
        }

        encode_frame(&WalRecord::Commit { txn_id: tx.txn_id }, &mut tx.redo)?;
        self.files.lock().wal.append(&tx.redo)?;

        self.counters.commits.fetch_add(1, Ordering::Relaxed);
        self.counters.puts.fetch_add(tx.puts, Ordering::Relaxed);
        self.counters
            .wal_bytes
            .fetch_add(tx.redo.len() as u64, Ordering::Relaxed);
        tx.undo.clear();
        tx.finished = true;
        Ok(())
    }
}

impl Store for LogStore {
    fn open(options: &StoreOptions, path: &Path) -> Result<Self> {
        options.validate()?;
        std::fs::create_dir_all(path)?;

        let lock = acquire_lock(path, options.lock_mode)?;

        let store_path = path.join(STORE_FILE_NAME);
        let wal_path = path.join(WAL_FILE_NAME);

        let mut tables = Tables::default();
        let store_replay = wal::replay(&store_path, |record| tables.apply(record))?;
        let wal_replay = wal::replay(&wal_path, |record| tables.apply(record))?;

        // Drop torn tails so new frames are not appended after garbage
        truncate_to(&store_path, store_replay.valid_len)?;
        truncate_to(&wal_path, wal_replay.valid_len)?;

        info!(
            path = %path.display(),
            durability = options.durability.as_str(),
            containers = tables.names.len(),
            records = tables.record_count(),
            store_txns = store_replay.txns_applied,
            wal_txns = wal_replay.txns_applied,
            incomplete_txns = store_replay.incomplete_txns + wal_replay.incomplete_txns,
            "Store opened"
        );

        let wal = WalWriter::open(&wal_path, options.durability)?;
        let store = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&store_path)?;
        let next_txn_id = store_replay.last_txn_id.max(wal_replay.last_txn_id) + 1;

        Ok(Self {
            dir: path.to_path_buf(),
            options: options.clone(),
            tables: RwLock::new(tables),
            files: Mutex::new(LogFiles { wal, store }),
            counters: Counters::default(),
            next_txn_id: AtomicU64::new(next_txn_id),
            _lock: lock,
        })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTransaction) -> Result<T>,
    {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        let mut tx = LogWriteTx::begin(self.tables.write(), &self.counters, txn_id)?;

        // Any early return drops `tx`, which rolls it back
        let value = f(&mut tx)?;
        self.commit(&mut tx)?;
        Ok(value)
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTransaction) -> Result<T>,
    {
        let tx = LogReadTx {
            tables: self.tables.read(),
        };
        f(&tx)
    }

    fn checkpoint(&self, wait_for_completion: bool) -> Result<()> {
        let mut guard = self.files.lock();
        let files = &mut *guard;

        let wal_len = files.wal.len();
        if wal_len > 0 {
            let mut reader = File::open(files.wal.path())?;
            let copied = io::copy(&mut reader, &mut files.store)?;
            if wait_for_completion {
                files.store.sync_data()?;
            }
            files.wal.reset()?;
            self.counters
                .checkpointed_bytes
                .fetch_add(copied, Ordering::Relaxed);
        }
        self.counters.checkpoints.fetch_add(1, Ordering::Relaxed);

        debug!(bytes = wal_len, wait = wait_for_completion, "Checkpoint complete");
        Ok(())
    }

    fn property(&self, name: &str) -> Option<String> {
        match name {
            PROPERTY_STATS => {
                let stats = self.stats().ok()?;
                Some(format!(
                    "containers:         {}\n\
                     records:            {}\n\
                     commits:            {}\n\
                     rollbacks:          {}\n\
                     puts:               {}\n\
                     checkpoints:        {}\n\
                     wal bytes:          {} (current {})\n\
                     checkpointed bytes: {} (store file {})\n\
                     page size:          {}\n\
                     cache size:         {}\n\
                     durability:         {}",
                    stats.containers,
                    stats.records,
                    stats.metrics.commits,
                    stats.metrics.rollbacks,
                    stats.metrics.puts,
                    stats.metrics.checkpoints,
                    stats.metrics.wal_bytes,
                    stats.wal_size,
                    stats.metrics.checkpointed_bytes,
                    stats.store_size,
                    stats.page_size,
                    stats.cache_size,
                    stats.durability,
                ))
            }
            PROPERTY_STATS_JSON => serde_json::to_string(&self.stats().ok()?).ok(),
            _ => None,
        }
    }
}

fn acquire_lock(dir: &Path, mode: LockMode) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(dir.join(LOCK_FILE_NAME))?;
    let locked = match mode {
        LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        LockMode::Normal => FileExt::try_lock_shared(&file),
    };
    locked.map_err(|e| Error::Busy(format!("{}: {}", dir.display(), e)))?;
    Ok(file)
}

fn truncate_to(path: &Path, len: u64) -> Result<()> {
    match OpenOptions::new().write(true).open(path) {
        Ok(file) => {
            if file.metadata()?.len() > len {
                file.set_len(len)?;
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Transactions
// ============================================================================

struct LogReadTx<'a> {
    tables: RwLockReadGuard<'a, Tables>,
}

impl ReadTransaction for LogReadTx<'_> {
    fn open_container(&self, name: &str) -> Result<ContainerId> {
        self.tables.lookup(name)
    }

    fn get(&self, container: ContainerId, key: &[u8]) -> Result<&[u8]> {
        self.tables.get(container, key)
    }

    fn cursor(&self, container: ContainerId) -> Result<Box<dyn Cursor + '_>> {
        self.tables.cursor(container)
    }
}

enum Undo {
    Put {
        container: ContainerId,
        key: Vec<u8>,
        previous: Option<Vec<u8>>,
    },
    Create {
        name: String,
    },
}

/// Read-write transaction holding the table write lock
///
/// Dropping it without a commit rolls back every change it made.
struct LogWriteTx<'a> {
    tables: RwLockWriteGuard<'a, Tables>,
    counters: &'a Counters,
    txn_id: u64,
    redo: Vec<u8>,
    undo: Vec<Undo>,
    puts: u64,
    finished: bool,
}

impl<'a> LogWriteTx<'a> {
    fn begin(
        tables: RwLockWriteGuard<'a, Tables>,
        counters: &'a Counters,
        txn_id: u64,
    ) -> Result<Self> {
        let mut redo = Vec::new();
        encode_frame(&WalRecord::Begin { txn_id }, &mut redo)?;
        Ok(Self {
            tables,
            counters,
            txn_id,
            redo,
            undo: Vec::new(),
            puts: 0,
            finished: false,
        })
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Put {
                    container,
                    key,
                    previous,
                } => {
                    if let Ok(tree) = self.tables.tree_mut(container) {
                        match previous {
                            Some(value) => {
                                tree.insert(key, value);
                            }
                            None => {
                                tree.remove(&key);
                            }
                        }
                    }
                }
                Undo::Create { name } => {
                    // Creations are undone newest first, so the tree is last
                    self.tables.names.remove(&name);
                    self.tables.trees.pop();
                }
            }
        }
        self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        self.finished = true;
    }
}

impl Drop for LogWriteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

impl ReadTransaction for LogWriteTx<'_> {
    fn open_container(&self, name: &str) -> Result<ContainerId> {
        self.tables.lookup(name)
    }

    fn get(&self, container: ContainerId, key: &[u8]) -> Result<&[u8]> {
        self.tables.get(container, key)
    }

    fn cursor(&self, container: ContainerId) -> Result<Box<dyn Cursor + '_>> {
        self.tables.cursor(container)
    }
}

impl WriteTransaction for LogWriteTx<'_> {
    fn create_container(&mut self, name: &str) -> Result<ContainerId> {
        let (id, created) = self.tables.create(name);
        if created {
            self.undo.push(Undo::Create {
                name: name.to_string(),
            });
            encode_frame(
                &WalRecord::CreateContainer {
                    name: Cow::Borrowed(name),
                },
                &mut self.redo,
            )?;
        }
        Ok(id)
    }

    fn put(&mut self, container: ContainerId, key: &[u8], value: &[u8]) -> Result<()> {
        let previous = self
            .tables
            .tree_mut(container)?
            .insert(key.to_vec(), value.to_vec());
        self.undo.push(Undo::Put {
            container,
            key: key.to_vec(),
            previous,
        });
        encode_frame(
            &WalRecord::Put {
                container: container.0,
                key: Cow::Borrowed(key),
                value: Cow::Borrowed(value),
            },
            &mut self.redo,
        )?;
        self.puts += 1;
        Ok(())
    }
}

// ============================================================================
// Cursor
// ============================================================================

struct TreeCursor<'a> {
    tree: &'a Tree,
    iter: btree_map::Iter<'a, Vec<u8>, Vec<u8>>,
    current: Option<(&'a Vec<u8>, &'a Vec<u8>)>,
}

impl<'a> TreeCursor<'a> {
    fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            iter: tree.iter(),
            current: None,
        }
    }
}

impl Cursor for TreeCursor<'_> {
    fn seek_first(&mut self) {
        self.iter = self.tree.iter();
        self.current = self.iter.next();
    }

    fn next(&mut self) {
        if self.current.is_some() {
            self.current = self.iter.next();
        }
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.map(|(k, _)| k.as_slice()).unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.current.map(|(_, v)| v.as_slice()).unwrap_or(&[])
    }

    fn status(&self) -> Result<()> {
        Ok(())
    }
}
