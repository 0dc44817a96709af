//! Compressible value generation
//!
//! A limited amount of data is built once and handed out over and over again.
//! The buffer is larger than typical compression windows (32KB) and large
//! enough to serve every value size a run asks for without visible
//! periodicity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minimum pool size (1 MiB)
pub const MIN_POOL_SIZE: usize = 1 << 20;

/// Length of each compressible fragment appended to the pool
pub const FRAGMENT_LEN: usize = 100;

/// Seed for the pool's random fragments
pub const POOL_SEED: u64 = 301;

/// Fill `dst` with `len` bytes that compress to roughly `ratio` of `len`
///
/// `max(1, len * ratio)` random printable bytes are drawn and repeated until
/// `len` bytes are filled.
pub fn compressible_fragment<R: Rng>(rng: &mut R, ratio: f64, len: usize, dst: &mut Vec<u8>) {
    let raw = ((len as f64 * ratio) as usize).max(1);
    let raw_data: Vec<u8> = (0..raw).map(|_| b' ' + rng.gen_range(0..95u8)).collect();

    dst.clear();
    while dst.len() < len {
        dst.extend_from_slice(&raw_data);
    }
    dst.truncate(len);
}

/// Reusable pool of compressible bytes with a rotating cursor
#[derive(Debug, Clone)]
pub struct CompressibleDataPool {
    data: Vec<u8>,
    pos: usize,
}

impl CompressibleDataPool {
    /// Build a pool of at least `max(MIN_POOL_SIZE, min_len)` bytes
    ///
    /// `min_len` is the largest slice the caller will ever request.
    pub fn new(compression_ratio: f64, min_len: usize) -> Self {
        Self::with_seed(compression_ratio, min_len, POOL_SEED)
    }

    /// Build a pool from an explicit seed
    pub fn with_seed(compression_ratio: f64, min_len: usize, seed: u64) -> Self {
        let target = MIN_POOL_SIZE.max(min_len);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Vec::with_capacity(target + FRAGMENT_LEN);
        let mut piece = Vec::with_capacity(FRAGMENT_LEN);
        while data.len() < target {
            compressible_fragment(&mut rng, compression_ratio, FRAGMENT_LEN, &mut piece);
            data.extend_from_slice(&piece);
        }
        Self { data, pos: 0 }
    }

    /// Size of the pool in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the pool is empty (never true for a constructed pool)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Next `len` bytes of the pool, wrapping to the start when exhausted
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the pool size.
    pub fn generate(&mut self, len: usize) -> &[u8] {
        assert!(
            len <= self.data.len(),
            "requested {} bytes from a {} byte pool",
            len,
            self.data.len()
        );
        if self.pos + len > self.data.len() {
            self.pos = 0;
        }
        let start = self.pos;
        self.pos += len;
        &self.data[start..self.pos]
    }
}
