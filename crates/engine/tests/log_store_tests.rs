//! Integration tests for LogStore
//!
//! These tests verify:
//! - Commit and rollback through the closure API
//! - Point lookups and cursor scans
//! - Checkpointing and recovery across reopen
//! - Exclusive locking

use dbbench_core::{DurabilityMode, Error, LockMode, StoreOptions};
use dbbench_engine::log_store::{STORE_FILE_NAME, WAL_FILE_NAME};
use dbbench_engine::{LogStore, Store, PROPERTY_STATS, PROPERTY_STATS_JSON};
use tempfile::TempDir;

fn open(dir: &TempDir) -> LogStore {
    LogStore::open(&StoreOptions::default(), &dir.path().join("store")).expect("open store")
}

fn put_all(store: &LogStore, pairs: &[(&str, &str)]) {
    store
        .update(|tx| {
            let table = tx.create_container("default")?;
            for (k, v) in pairs {
                tx.put(table, k.as_bytes(), v.as_bytes())?;
            }
            Ok(())
        })
        .expect("update");
}

fn scan(store: &LogStore) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .view(|tx| {
            let table = tx.open_container("default")?;
            let mut cursor = tx.cursor(table)?;
            let mut out = Vec::new();
            cursor.seek_first();
            while cursor.is_valid() {
                out.push((cursor.key().to_vec(), cursor.value().to_vec()));
                cursor.next();
            }
            cursor.status()?;
            Ok(out)
        })
        .expect("view")
}

#[test]
fn test_commit_makes_writes_visible() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    put_all(&store, &[("b", "2"), ("a", "1")]);

    let value = store
        .view(|tx| {
            let table = tx.open_container("default")?;
            Ok(tx.get(table, b"a")?.to_vec())
        })
        .unwrap();
    assert_eq!(value, b"1");

    let metrics = store.metrics();
    assert_eq!(metrics.commits, 1);
    assert_eq!(metrics.puts, 2);
    assert_eq!(metrics.rollbacks, 0);
}

#[test]
fn test_missing_key_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    put_all(&store, &[("a", "1")]);

    let err = store
        .view(|tx| {
            let table = tx.open_container("default")?;
            tx.get(table, b"zzz").map(|v| v.to_vec())
        })
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_missing_container() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let err = store.view(|tx| tx.open_container("nope")).unwrap_err();
    assert!(matches!(err, Error::ContainerNotFound(name) if name == "nope"));
}

#[test]
fn test_error_in_closure_rolls_back() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    put_all(&store, &[("a", "1")]);

    let result: Result<(), Error> = store.update(|tx| {
        let table = tx.create_container("default")?;
        tx.put(table, b"a", b"overwritten")?;
        tx.put(table, b"b", b"2")?;
        tx.create_container("scratch")?;
        Err(Error::invalid_argument("abort"))
    });
    assert!(result.is_err());

    assert_eq!(scan(&store), vec![(b"a".to_vec(), b"1".to_vec())]);
    let err = store.view(|tx| tx.open_container("scratch")).unwrap_err();
    assert!(matches!(err, Error::ContainerNotFound(_)));

    let metrics = store.metrics();
    assert_eq!(metrics.commits, 1);
    assert_eq!(metrics.rollbacks, 1);
    assert_eq!(metrics.puts, 1);
}

#[test]
fn test_cursor_rewinds_after_walking_off_the_end() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    put_all(&store, &[("a", "1"), ("b", "2")]);

    let keys = store
        .view(|tx| {
            let table = tx.open_container("default")?;
            let mut cursor = tx.cursor(table)?;
            let mut keys = Vec::new();
            for _ in 0..6 {
                if !cursor.is_valid() {
                    cursor.seek_first();
                    continue;
                }
                keys.push(cursor.key().to_vec());
                cursor.next();
            }
            Ok(keys)
        })
        .unwrap();
    // Six steps: seek, a, b, seek, a, b
    assert_eq!(
        keys,
        vec![b"a".to_vec(), b"b".to_vec(), b"a".to_vec(), b"b".to_vec()]
    );
}

#[test]
fn test_checkpoint_moves_log_into_store_file() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    put_all(&store, &[("a", "1"), ("b", "2")]);

    let wal_before = store.wal_size();
    assert!(wal_before > 0);

    store.checkpoint(true).unwrap();

    assert_eq!(store.wal_size(), 0);
    let store_file = store.path().join(STORE_FILE_NAME);
    assert_eq!(std::fs::metadata(store_file).unwrap().len(), wal_before);

    let metrics = store.metrics();
    assert_eq!(metrics.checkpoints, 1);
    assert_eq!(metrics.checkpointed_bytes, wal_before);
}

#[test]
fn test_reopen_recovers_store_file_and_log() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        put_all(&store, &[("a", "1"), ("b", "2")]);
        store.checkpoint(true).unwrap();
        put_all(&store, &[("b", "22"), ("c", "3")]);
    }

    let store = open(&dir);
    assert_eq!(
        scan(&store),
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"22".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );

    // Transaction ids keep increasing across reopen
    put_all(&store, &[("d", "4")]);
    drop(store);
    let store = open(&dir);
    assert_eq!(scan(&store).len(), 4);
}

#[test]
fn test_reopen_discards_torn_log_tail() {
    let dir = TempDir::new().unwrap();
    let wal_path = dir.path().join("store").join(WAL_FILE_NAME);
    {
        let store = open(&dir);
        put_all(&store, &[("a", "1")]);
        put_all(&store, &[("b", "2")]);
    }

    let len = std::fs::metadata(&wal_path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 2).unwrap();
    drop(file);

    let store = open(&dir);
    assert_eq!(scan(&store), vec![(b"a".to_vec(), b"1".to_vec())]);
    assert_eq!(store.wal_size(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_exclusive_lock_rejects_second_handle() {
    let dir = TempDir::new().unwrap();
    let _store = open(&dir);

    let result = LogStore::open(&StoreOptions::default(), &dir.path().join("store"));
    assert!(matches!(result, Err(Error::Busy(_))));
}

#[test]
fn test_shared_lock_allows_second_handle() {
    let dir = TempDir::new().unwrap();
    let opts = StoreOptions {
        lock_mode: LockMode::Normal,
        ..Default::default()
    };
    let path = dir.path().join("store");
    let _a = LogStore::open(&opts, &path).unwrap();
    let _b = LogStore::open(&opts, &path).unwrap();
}

#[test]
fn test_invalid_options_rejected() {
    let dir = TempDir::new().unwrap();
    let opts = StoreOptions {
        page_size: 1000,
        ..Default::default()
    };
    let result = LogStore::open(&opts, dir.path());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_full_durability_commits() {
    let dir = TempDir::new().unwrap();
    let opts = StoreOptions {
        durability: DurabilityMode::Full,
        ..Default::default()
    };
    let store = LogStore::open(&opts, dir.path()).unwrap();
    put_all(&store, &[("a", "1")]);
    assert_eq!(store.options().durability, DurabilityMode::Full);
    assert_eq!(store.metrics().commits, 1);
}

#[test]
fn test_stats_properties() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    put_all(&store, &[("a", "1"), ("b", "2")]);

    let text = store.property(PROPERTY_STATS).unwrap();
    assert!(text.contains("records:            2"));
    assert!(text.contains("durability:         off"));

    let json = store.property(PROPERTY_STATS_JSON).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["records"], 2);
    assert_eq!(parsed["puts"], 2);

    assert!(store.property("dbbench.unknown").is_none());
}
