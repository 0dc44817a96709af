//! Workload executors
//!
//! Each executor drives the store through scoped transactions, one batch per
//! transaction, and reports every finished operation to [`Instrumentation`].
//!
//! - **write**: puts generated values, checkpointing as the policy asks
//! - **read**: point lookups; absent keys count as successful reads
//! - **scan**: cursor walk from the first key, wrapping when it runs off the end

use crate::checkpoint::CheckpointPolicy;
use crate::data::CompressibleDataPool;
use crate::instrumentation::Instrumentation;
use crate::keys::{encode_key, KeyGenerator, KeyOrder};
use dbbench_core::Result;
use dbbench_engine::Store;
use tracing::debug;

/// Container every workload reads and writes
pub const CONTAINER_NAME: &str = "default";

/// Parameters of one write run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOp {
    /// Key visiting order
    pub order: KeyOrder,
    /// Records written; also the key space for random order
    pub entries: u64,
    /// Bytes per value
    pub value_size: usize,
    /// Puts per transaction
    pub batch: u64,
}

/// Borrowed state shared by the executors of one scenario
pub struct Executor<'a, S: Store> {
    store: &'a S,
    inst: &'a mut Instrumentation,
    keys: &'a mut KeyGenerator,
    pool: &'a mut CompressibleDataPool,
}

impl<'a, S: Store> Executor<'a, S> {
    /// Bundle the store with the run's generators and instrumentation
    pub fn new(
        store: &'a S,
        inst: &'a mut Instrumentation,
        keys: &'a mut KeyGenerator,
        pool: &'a mut CompressibleDataPool,
    ) -> Self {
        Self {
            store,
            inst,
            keys,
            pool,
        }
    }

    /// Write `op.entries` records in batches of `op.batch`
    ///
    /// After every transaction the policy sees the cumulative byte count and
    /// may trigger a blocking checkpoint.
    pub fn write(&mut self, op: &WriteOp, policy: &mut CheckpointPolicy) -> Result<()> {
        let batch = op.batch.max(1);
        let mut start = 0;
        while start < op.entries {
            let end = start.saturating_add(batch).min(op.entries);
            let (inst, keys, pool) = (&mut *self.inst, &mut *self.keys, &mut *self.pool);

            self.store.update(|tx| {
                let table = tx.create_container(CONTAINER_NAME)?;
                for index in start..end {
                    let value = pool.generate(op.value_size);
                    let key = encode_key(keys.next_key(op.order, index, op.entries));
                    tx.put(table, &key, value)?;
                    inst.add_bytes((key.len() + value.len()) as u64);
                    inst.finished_single_op();
                }
                Ok(())
            })?;

            if policy.should_checkpoint(self.inst.bytes()) {
                debug!(bytes = self.inst.bytes(), "Policy checkpoint");
                self.store.checkpoint(true)?;
            }
            start = end;
        }
        Ok(())
    }

    /// Perform `reads` point lookups in batches of `batch`
    ///
    /// Keys are drawn from `[0, reads)`. Found records add their key and value
    /// length to the byte count; missing keys add nothing.
    pub fn read(&mut self, order: KeyOrder, reads: u64, batch: u64) -> Result<()> {
        let batch = batch.max(1);
        let mut start = 0;
        while start < reads {
            let end = start.saturating_add(batch).min(reads);
            let (inst, keys) = (&mut *self.inst, &mut *self.keys);

            self.store.view(|tx| {
                let table = tx.open_container(CONTAINER_NAME)?;
                for index in start..end {
                    let key = encode_key(keys.next_key(order, index, reads));
                    match tx.get(table, &key) {
                        Ok(value) => inst.add_bytes((key.len() + value.len()) as u64),
                        Err(e) if e.is_not_found() => {}
                        Err(e) => return Err(e),
                    }
                    inst.finished_single_op();
                }
                Ok(())
            })?;
            start = end;
        }
        Ok(())
    }

    /// Observe `reads` records through one cursor
    ///
    /// The cursor is repositioned at the first key whenever it is invalid, so
    /// small containers are walked repeatedly. An empty container ends the
    /// scan early.
    pub fn scan(&mut self, reads: u64) -> Result<()> {
        let inst = &mut *self.inst;
        self.store.view(|tx| {
            let table = tx.open_container(CONTAINER_NAME)?;
            let mut cursor = tx.cursor(table)?;
            let mut observed = 0;
            while observed < reads {
                if !cursor.is_valid() {
                    cursor.status()?;
                    cursor.seek_first();
                    if !cursor.is_valid() {
                        debug!("Scan stopped on empty container");
                        break;
                    }
                    continue;
                }
                inst.add_bytes((cursor.key().len() + cursor.value().len()) as u64);
                cursor.next();
                inst.finished_single_op();
                observed += 1;
            }
            cursor.status()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_SIZE;
    use dbbench_core::StoreOptions;
    use dbbench_engine::LogStore;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: LogStore,
        inst: Instrumentation,
        keys: KeyGenerator,
        pool: CompressibleDataPool,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = LogStore::open(&StoreOptions::default(), dir.path()).unwrap();
            store
                .update(|tx| tx.create_container(CONTAINER_NAME).map(|_| ()))
                .unwrap();
            let mut inst = Instrumentation::new(false, false);
            inst.start();
            Self {
                _dir: dir,
                store,
                inst,
                keys: KeyGenerator::default(),
                pool: CompressibleDataPool::new(0.5, 100),
            }
        }

        fn executor(&mut self) -> Executor<'_, LogStore> {
            Executor::new(&self.store, &mut self.inst, &mut self.keys, &mut self.pool)
        }

        fn stored_keys(&self) -> Vec<Vec<u8>> {
            self.store
                .view(|tx| {
                    let table = tx.open_container(CONTAINER_NAME)?;
                    let mut cursor = tx.cursor(table)?;
                    let mut keys = Vec::new();
                    cursor.seek_first();
                    while cursor.is_valid() {
                        keys.push(cursor.key().to_vec());
                        cursor.next();
                    }
                    Ok(keys)
                })
                .unwrap()
        }
    }

    fn large_policy() -> CheckpointPolicy {
        CheckpointPolicy::new(4096, u64::MAX / 4096, 0)
    }

    #[test]
    fn test_sequential_write_touches_each_key_once() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Sequential,
            entries: 250,
            value_size: 100,
            batch: 1,
        };
        fx.executor().write(&op, &mut large_policy()).unwrap();

        let keys = fx.stored_keys();
        let expected: Vec<Vec<u8>> = (0..250).map(|k| encode_key(k).to_vec()).collect();
        assert_eq!(keys, expected);
        assert_eq!(fx.inst.done(), 250);
        assert_eq!(fx.inst.bytes(), 250 * (KEY_SIZE as u64 + 100));
        assert_eq!(fx.store.metrics().commits, 1 + 250);
    }

    #[test]
    fn test_last_batch_is_clamped() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Sequential,
            entries: 2500,
            value_size: 10,
            batch: 1000,
        };
        fx.executor().write(&op, &mut large_policy()).unwrap();

        let keys = fx.stored_keys();
        assert_eq!(keys.len(), 2500);
        assert_eq!(keys.last().unwrap(), &encode_key(2499).to_vec());
        assert_eq!(fx.inst.done(), 2500);
        // Three transactions on top of the container creation
        assert_eq!(fx.store.metrics().commits, 4);
    }

    #[test]
    fn test_random_write_stays_in_key_space() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Random,
            entries: 100,
            value_size: 8,
            batch: 10,
        };
        fx.executor().write(&op, &mut large_policy()).unwrap();

        let keys = fx.stored_keys();
        assert!(!keys.is_empty());
        assert!(keys.len() <= 100);
        assert!(keys.iter().all(|k| k.as_slice() < &encode_key(100)[..]));
        assert_eq!(fx.store.metrics().puts, 100);
    }

    #[test]
    fn test_policy_triggers_checkpoints() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Sequential,
            entries: 1000,
            value_size: 100,
            batch: 1,
        };
        let mut policy = CheckpointPolicy::new(4096, 8, 0);
        fx.executor().write(&op, &mut policy).unwrap();
        assert_eq!(fx.store.metrics().checkpoints, 3);
    }

    #[test]
    fn test_read_of_missing_keys_is_not_an_error() {
        let mut fx = Fixture::new();
        fx.executor().read(KeyOrder::Random, 500, 1).unwrap();
        assert_eq!(fx.inst.done(), 500);
        assert_eq!(fx.inst.bytes(), 0);
    }

    #[test]
    fn test_read_counts_found_bytes() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Sequential,
            entries: 50,
            value_size: 20,
            batch: 50,
        };
        fx.executor().write(&op, &mut large_policy()).unwrap();
        fx.inst.start();

        // Keys 0..100, half of which exist
        fx.executor().read(KeyOrder::Sequential, 100, 1).unwrap();
        assert_eq!(fx.inst.done(), 100);
        assert_eq!(fx.inst.bytes(), 50 * (KEY_SIZE as u64 + 20));
    }

    #[test]
    fn test_read_without_container_fails() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open(&StoreOptions::default(), dir.path()).unwrap();
        let mut inst = Instrumentation::new(false, false);
        let mut keys = KeyGenerator::default();
        let mut pool = CompressibleDataPool::new(0.5, 0);
        let mut exec = Executor::new(&store, &mut inst, &mut keys, &mut pool);
        assert!(exec.read(KeyOrder::Random, 10, 1).is_err());
    }

    #[test]
    fn test_scan_wraps_around_small_container() {
        let mut fx = Fixture::new();
        let op = WriteOp {
            order: KeyOrder::Sequential,
            entries: 10,
            value_size: 4,
            batch: 10,
        };
        fx.executor().write(&op, &mut large_policy()).unwrap();
        fx.inst.start();

        fx.executor().scan(25).unwrap();
        assert_eq!(fx.inst.done(), 25);
        assert_eq!(fx.inst.bytes(), 25 * (KEY_SIZE as u64 + 4));
    }

    #[test]
    fn test_scan_of_empty_container_stops() {
        let mut fx = Fixture::new();
        fx.executor().scan(1000).unwrap();
        assert_eq!(fx.inst.done(), 0);
    }
}
