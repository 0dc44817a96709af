//! Store open options
//!
//! Controls WAL sync behavior, handle exclusivity and memory budget.

use crate::error::{Error, Result};

/// Smallest page size a store accepts
pub const MIN_PAGE_SIZE: usize = 512;
/// Largest page size a store accepts
pub const MAX_PAGE_SIZE: usize = 65536;
/// Default page size (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Durability mode for commits
///
/// | Mode | fsync | Data Loss Window |
/// |------|-------|-----------------|
/// | Off  | Never | Everything not yet written back by the OS |
/// | Full | Every commit | Zero |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Commits reach the OS page cache but are never fsynced
    #[default]
    Off,

    /// fsync after every commit (slow, maximum durability)
    Full,
}

impl DurabilityMode {
    /// Check if this mode requires fsync on every commit
    pub fn requires_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Full)
    }

    /// Pick a mode from a "sync writes" switch
    pub fn from_sync(sync: bool) -> Self {
        if sync {
            DurabilityMode::Full
        } else {
            DurabilityMode::Off
        }
    }

    /// Human-readable name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            DurabilityMode::Off => "off",
            DurabilityMode::Full => "full",
        }
    }
}

/// How a store handle shares its files with other handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Shared advisory lock; other shared handles may open the store
    Normal,

    /// Exclusive advisory lock; a second handle fails with `Busy`
    #[default]
    Exclusive,
}

/// Options used when opening a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Commit durability
    pub durability: DurabilityMode,
    /// Handle exclusivity
    pub lock_mode: LockMode,
    /// Cache budget in bytes
    pub cache_size: usize,
    /// Page size in bytes
    pub page_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            durability: DurabilityMode::Off,
            lock_mode: LockMode::Exclusive,
            cache_size: 1024 * DEFAULT_PAGE_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreOptions {
    /// Check option invariants
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the page size is not a power of two in
    /// `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`, or the cache budget is smaller than
    /// one page.
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two()
            || self.page_size < MIN_PAGE_SIZE
            || self.page_size > MAX_PAGE_SIZE
        {
            return Err(Error::invalid_argument(format!(
                "page size {} is not a power of two in [{}, {}]",
                self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        if self.cache_size < self.page_size {
            return Err(Error::invalid_argument(format!(
                "cache size {} is smaller than one page ({})",
                self.cache_size, self.page_size
            )));
        }
        Ok(())
    }
}

/// Handle to a named container inside a store
///
/// Ids are assigned in creation order and are only meaningful to the
/// store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u32);

impl ContainerId {
    /// Position of the container in the store's table list
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
