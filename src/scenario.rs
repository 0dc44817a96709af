//! Scenario table
//!
//! Every benchmark name maps to a fixed workload descriptor. The list given
//! on the command line is parsed into [`ScenarioEntry`] values up front; names
//! that match nothing are kept as [`ScenarioEntry::Unknown`] so the run can
//! warn about them in order.

use crate::keys::KeyOrder;
use dbbench_core::DurabilityMode;
use std::fmt;
use std::str::FromStr;

/// Transactions per batch for the `*batch` scenarios
pub const BATCH_SIZE: u64 = 1000;

/// Value size for the `*100K` scenarios
pub const LARGE_VALUE_SIZE: usize = 100_000;

/// Whether a write scenario starts from an empty store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Reopen a new, empty store before timing
    Fresh,
    /// Write into the store left by earlier scenarios
    Existing,
}

/// How many entries a scenario touches, relative to `--num`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryScale {
    /// `num`
    Full,
    /// `num / divisor`
    Divided(u64),
}

impl EntryScale {
    /// Apply to `num`
    pub fn apply(self, num: u64) -> u64 {
        match self {
            EntryScale::Full => num,
            EntryScale::Divided(d) => num / d,
        }
    }
}

/// Value size used by a write scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSize {
    /// `--value_size`
    Configured,
    /// A fixed size
    Fixed(usize),
}

impl ValueSize {
    /// Resolve against the configured value size
    pub fn resolve(self, configured: usize) -> usize {
        match self {
            ValueSize::Configured => configured,
            ValueSize::Fixed(n) => n,
        }
    }
}

/// Parameters of a write scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSpec {
    /// Durability of the store the scenario writes into (fresh stores only)
    pub durability: DurabilityMode,
    /// Key visiting order
    pub order: KeyOrder,
    /// Fresh or existing store
    pub freshness: Freshness,
    /// Entries written
    pub entries: EntryScale,
    /// Value size
    pub value_size: ValueSize,
    /// Puts per transaction
    pub batch: u64,
}

/// Workload run by a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Put records
    Write(WriteSpec),
    /// Point lookups over `reads / divisor` keys
    Read {
        /// Key visiting order
        order: KeyOrder,
        /// Lookups per transaction
        batch: u64,
        /// Read count divisor (1 for the full count)
        divisor: u64,
    },
    /// Cursor scan from the first key
    Scan,
    /// Print store statistics
    Stats,
}

/// A named benchmark scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Sequential writes, one per transaction
    FillSeq,
    /// Sequential writes of N/100 entries with full durability
    FillSeqSync,
    /// Sequential writes, 1000 per transaction
    FillSeqBatch,
    /// Random writes, one per transaction
    FillRandom,
    /// Random writes of N/100 entries with full durability
    FillRandSync,
    /// Random writes, 1000 per transaction
    FillRandBatch,
    /// Random writes into the existing store
    Overwrite,
    /// Random writes into the existing store, 1000 per transaction
    OverwriteBatch,
    /// Random point lookups
    ReadRandom,
    /// Cursor scan
    ReadSeq,
    /// Random writes of N/1000 100K values
    FillRand100K,
    /// Sequential writes of N/1000 100K values
    FillSeq100K,
    /// Sequential point lookups over reads/1000 keys
    ReadSeq100K,
    /// Random point lookups over reads/1000 keys
    ReadRand100K,
    /// Store statistics
    Stats,
}

impl Scenario {
    /// Every scenario, in table order
    pub const ALL: [Scenario; 15] = [
        Scenario::FillSeq,
        Scenario::FillSeqSync,
        Scenario::FillSeqBatch,
        Scenario::FillRandom,
        Scenario::FillRandSync,
        Scenario::FillRandBatch,
        Scenario::Overwrite,
        Scenario::OverwriteBatch,
        Scenario::ReadRandom,
        Scenario::ReadSeq,
        Scenario::FillRand100K,
        Scenario::FillSeq100K,
        Scenario::ReadSeq100K,
        Scenario::ReadRand100K,
        Scenario::Stats,
    ];

    /// Command-line name
    pub fn name(self) -> &'static str {
        match self {
            Scenario::FillSeq => "fillseq",
            Scenario::FillSeqSync => "fillseqsync",
            Scenario::FillSeqBatch => "fillseqbatch",
            Scenario::FillRandom => "fillrandom",
            Scenario::FillRandSync => "fillrandsync",
            Scenario::FillRandBatch => "fillrandbatch",
            Scenario::Overwrite => "overwrite",
            Scenario::OverwriteBatch => "overwritebatch",
            Scenario::ReadRandom => "readrandom",
            Scenario::ReadSeq => "readseq",
            Scenario::FillRand100K => "fillrand100K",
            Scenario::FillSeq100K => "fillseq100K",
            Scenario::ReadSeq100K => "readseq100K",
            Scenario::ReadRand100K => "readrand100K",
            Scenario::Stats => "stats",
        }
    }

    /// Workload descriptor
    pub fn workload(self) -> Workload {
        use DurabilityMode::{Full, Off};
        use Freshness::{Existing, Fresh};
        use KeyOrder::{Random, Sequential};

        let write = |durability, order, freshness, entries, value_size, batch| {
            Workload::Write(WriteSpec {
                durability,
                order,
                freshness,
                entries,
                value_size,
                batch,
            })
        };
        let configured = ValueSize::Configured;
        let large = ValueSize::Fixed(LARGE_VALUE_SIZE);

        match self {
            Scenario::FillSeq => write(Off, Sequential, Fresh, EntryScale::Full, configured, 1),
            Scenario::FillSeqSync => {
                write(Full, Sequential, Fresh, EntryScale::Divided(100), configured, 1)
            }
            Scenario::FillSeqBatch => {
                write(Off, Sequential, Fresh, EntryScale::Full, configured, BATCH_SIZE)
            }
            Scenario::FillRandom => write(Off, Random, Fresh, EntryScale::Full, configured, 1),
            Scenario::FillRandSync => {
                write(Full, Random, Fresh, EntryScale::Divided(100), configured, 1)
            }
            Scenario::FillRandBatch => {
                write(Off, Random, Fresh, EntryScale::Full, configured, BATCH_SIZE)
            }
            Scenario::Overwrite => write(Off, Random, Existing, EntryScale::Full, configured, 1),
            Scenario::OverwriteBatch => {
                write(Off, Random, Existing, EntryScale::Full, configured, BATCH_SIZE)
            }
            Scenario::FillRand100K => {
                write(Off, Random, Fresh, EntryScale::Divided(1000), large, 1)
            }
            Scenario::FillSeq100K => {
                write(Off, Sequential, Fresh, EntryScale::Divided(1000), large, 1)
            }
            Scenario::ReadRandom => Workload::Read {
                order: Random,
                batch: 1,
                divisor: 1,
            },
            Scenario::ReadSeq => Workload::Scan,
            Scenario::ReadSeq100K => Workload::Read {
                order: Sequential,
                batch: 1,
                divisor: 1000,
            },
            Scenario::ReadRand100K => Workload::Read {
                order: Random,
                batch: 1,
                divisor: 1000,
            },
            Scenario::Stats => Workload::Stats,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that matches no scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScenario(pub String);

impl fmt::Display for UnknownScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown benchmark '{}'", self.0)
    }
}

impl std::error::Error for UnknownScenario {}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// One item of a parsed scenario list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioEntry {
    /// A scenario to run
    Known(Scenario),
    /// A name to warn about and skip
    Unknown(UnknownScenario),
}

/// Parse a comma-separated scenario list, dropping empty segments
pub fn parse_scenarios(list: &str) -> Vec<ScenarioEntry> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| match name.parse::<Scenario>() {
            Ok(scenario) => ScenarioEntry::Known(scenario),
            Err(unknown) => ScenarioEntry::Unknown(unknown),
        })
        .collect()
}
