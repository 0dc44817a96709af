//! Store contract consumed by the benchmark harness
//!
//! A store exposes scoped transactions through closures:
//!
//! 1. **update**: `store.update(|tx| { ... })` hands out a read-write
//!    transaction, commits when the closure returns `Ok`, rolls back otherwise
//! 2. **view**: `store.view(|tx| { ... })` hands out a read-only transaction
//!
//! The transaction never outlives the closure, so no handle can leak across
//! units of work.
//!
//! # Example
//!
//! ```ignore
//! use dbbench_engine::{LogStore, Store};
//!
//! let store = LogStore::open(&StoreOptions::default(), path)?;
//! store.update(|tx| {
//!     let table = tx.create_container("default")?;
//!     tx.put(table, b"key", b"value")
//! })?;
//! ```

use dbbench_core::{ContainerId, Result, StoreOptions};
use std::path::Path;

/// A transactional ordered key-value store
pub trait Store: Sized {
    /// Open (creating if needed) the store rooted at `path`
    fn open(options: &StoreOptions, path: &Path) -> Result<Self>;

    /// Run `f` inside a read-write transaction
    ///
    /// Commits if `f` returns `Ok`, rolls back and returns the error otherwise.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTransaction) -> Result<T>;

    /// Run `f` inside a read-only transaction
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTransaction) -> Result<T>;

    /// Move committed log records into the primary store file
    ///
    /// With `wait_for_completion` the store file is synced before returning.
    fn checkpoint(&self, wait_for_completion: bool) -> Result<()>;

    /// Look up a diagnostic property; `None` if the name is unknown
    fn property(&self, name: &str) -> Option<String>;
}

/// Operations available in every transaction
pub trait ReadTransaction {
    /// Resolve an existing container by name
    fn open_container(&self, name: &str) -> Result<ContainerId>;

    /// Point lookup; absent keys yield `Error::NotFound`
    fn get(&self, container: ContainerId, key: &[u8]) -> Result<&[u8]>;

    /// Create a cursor over the container's keys in ascending order
    ///
    /// The cursor starts unpositioned.
    fn cursor(&self, container: ContainerId) -> Result<Box<dyn Cursor + '_>>;
}

/// Operations that need a read-write transaction
pub trait WriteTransaction: ReadTransaction {
    /// Open the named container, creating it if it does not exist
    fn create_container(&mut self, name: &str) -> Result<ContainerId>;

    /// Insert or overwrite a record
    fn put(&mut self, container: ContainerId, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Forward iterator over a container's keyspace
pub trait Cursor {
    /// Position on the smallest key (invalid if the container is empty)
    fn seek_first(&mut self);

    /// Advance to the next key; walks off the end into the invalid state
    fn next(&mut self);

    /// Whether the cursor is positioned on a record
    fn is_valid(&self) -> bool;

    /// Key at the current position (empty when invalid)
    fn key(&self) -> &[u8];

    /// Value at the current position (empty when invalid)
    fn value(&self) -> &[u8];

    /// Sticky error status of the cursor
    fn status(&self) -> Result<()>;
}
