//! Key ordering and key encoding
//!
//! Keys are fixed-width, zero-padded, 16-character decimal strings, so
//! lexicographic order matches numeric order.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Width of every key in bytes
pub const KEY_SIZE: usize = 16;

/// Keys must stay below this bound to fit in `KEY_SIZE` digits
pub const MAX_KEY: u64 = 10_000_000_000_000_000;

/// Seed for random key order
pub const KEY_SEED: u64 = 301;

/// Encoded key
pub type KeyBuf = [u8; KEY_SIZE];

/// Render `k` as 16 zero-padded decimal digits
pub fn encode_key(mut k: u64) -> KeyBuf {
    debug_assert!(k < MAX_KEY, "key {} does not fit in {} digits", k, KEY_SIZE);
    let mut buf = [b'0'; KEY_SIZE];
    for slot in buf.iter_mut().rev() {
        *slot = b'0' + (k % 10) as u8;
        k /= 10;
    }
    buf
}

/// Order in which a workload visits keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    /// Key equals the loop index
    Sequential,
    /// Uniform draw over the active key range
    Random,
}

/// Produces the next key for a workload
///
/// Random draws come from one generator seeded at construction, so two runs
/// with the same settings visit the same keys.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    rng: StdRng,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(KEY_SEED)
    }
}

impl KeyGenerator {
    /// Create a generator with an explicit seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Key for loop position `index` in a key space of `bound` keys
    ///
    /// `bound` must be non-zero for random order.
    pub fn next_key(&mut self, order: KeyOrder, index: u64, bound: u64) -> u64 {
        match order {
            KeyOrder::Sequential => index,
            KeyOrder::Random => self.rng.next_u64() % bound,
        }
    }
}
