//! Harness-driven checkpoints
//!
//! The store has no periodic checkpoint of its own, so during write
//! workloads the harness asks for one every `pages × page_size` bytes of
//! logical payload (keys plus values, not physical pages). This keeps the
//! write-ahead log bounded during long runs.

/// Decides when a write workload should checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointPolicy {
    threshold: u64,
    baseline: u64,
}

impl CheckpointPolicy {
    /// Trigger every `pages` pages of `page_size` bytes
    ///
    /// `baseline` is the cumulative byte count when the workload starts.
    pub fn new(page_size: usize, pages: u64, baseline: u64) -> Self {
        Self {
            threshold: (page_size as u64).saturating_mul(pages).max(1),
            baseline,
        }
    }

    /// Bytes between checkpoints
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Bytes written since the last trigger, given the cumulative count
    pub fn pending(&self, total_bytes: u64) -> u64 {
        total_bytes.saturating_sub(self.baseline)
    }

    /// Report the cumulative byte count after a transaction
    ///
    /// Returns true when a checkpoint is due; the baseline then moves to
    /// `total_bytes`.
    pub fn should_checkpoint(&mut self, total_bytes: u64) -> bool {
        if self.pending(total_bytes) >= self.threshold {
            self.baseline = total_bytes;
            true
        } else {
            false
        }
    }
}
