//! Write-ahead log records, frame encoding and file operations
//!
//! ## Frame Format
//!
//! ```text
//! [length: u32][crc32: u32][payload: bytes]
//! ```
//!
//! - **length**: Size of the payload (NOT including the 8-byte header)
//! - **crc32**: CRC32 checksum over the payload
//! - **payload**: bincode-serialized [`WalRecord`]
//!
//! The primary store file uses the same framing, so a checkpoint is a plain
//! byte copy of the log followed by a truncate.
//!
//! ## Transactions
//!
//! A transaction is appended as one contiguous run of frames:
//! `Begin`, any number of `CreateContainer`/`Put`, then `Commit`. Replay
//! applies a transaction only once its `Commit` frame has been read.

use crc32fast::Hasher;
use dbbench_core::{DurabilityMode, Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Size of the frame header (length + crc)
pub const FRAME_HEADER_LEN: usize = 8;

/// Frames larger than this are treated as corruption
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// A single log record
///
/// Key and value bytes are borrowed while encoding and owned after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord<'a> {
    /// Start of a transaction
    Begin {
        /// Transaction identifier (monotonic per store)
        txn_id: u64,
    },

    /// Container creation; ids are assigned in creation order
    CreateContainer {
        /// Container name
        name: Cow<'a, str>,
    },

    /// Insert or overwrite
    Put {
        /// Container id
        container: u32,
        /// Key bytes
        key: Cow<'a, [u8]>,
        /// Value bytes
        value: Cow<'a, [u8]>,
    },

    /// Successful end of a transaction
    Commit {
        /// Transaction identifier
        txn_id: u64,
    },
}

/// A decoded record that owns its bytes
pub type OwnedRecord = WalRecord<'static>;

/// Append the framed encoding of `record` to `buf`
pub fn encode_frame(record: &WalRecord<'_>, buf: &mut Vec<u8>) -> Result<()> {
    let start = buf.len();
    buf.extend_from_slice(&[0u8; FRAME_HEADER_LEN]);
    bincode::serialize_into(&mut *buf, record)?;

    let payload_len = buf.len() - start - FRAME_HEADER_LEN;
    if payload_len > MAX_FRAME_LEN {
        buf.truncate(start);
        return Err(Error::invalid_argument(format!(
            "record of {} bytes exceeds the {} byte frame limit",
            payload_len, MAX_FRAME_LEN
        )));
    }

    let mut hasher = Hasher::new();
    hasher.update(&buf[start + FRAME_HEADER_LEN..]);
    let crc = hasher.finalize();

    buf[start..start + 4].copy_from_slice(&(payload_len as u32).to_le_bytes());
    buf[start + 4..start + 8].copy_from_slice(&crc.to_le_bytes());
    Ok(())
}

/// Outcome of reading one frame
#[derive(Debug)]
pub enum Frame {
    /// A valid record and the number of bytes it occupied
    Record(OwnedRecord, usize),
    /// Clean end of input
    End,
    /// Partial or damaged frame; nothing after it can be trusted
    Torn(String),
}

/// Read the next frame from `reader`
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    match read_full(reader, &mut header)? {
        0 => return Ok(Frame::End),
        n if n < FRAME_HEADER_LEN => return Ok(Frame::Torn("partial header".to_string())),
        _ => {}
    }

    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if len > MAX_FRAME_LEN {
        return Ok(Frame::Torn(format!("frame length {} out of range", len)));
    }

    let mut payload = vec![0u8; len];
    if read_full(reader, &mut payload)? < len {
        return Ok(Frame::Torn("partial payload".to_string()));
    }

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    if hasher.finalize() != crc {
        return Ok(Frame::Torn("CRC mismatch".to_string()));
    }

    match bincode::deserialize::<OwnedRecord>(&payload) {
        Ok(record) => Ok(Frame::Record(record, FRAME_HEADER_LEN + len)),
        Err(e) => Ok(Frame::Torn(format!("undecodable payload: {}", e))),
    }
}

/// Fill `buf` as far as the input allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Statistics from replaying one log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Frames decoded (committed or not)
    pub frames: u64,
    /// Transactions applied
    pub txns_applied: u64,
    /// Transactions without a commit frame (discarded)
    pub incomplete_txns: u64,
    /// Highest transaction id seen
    pub last_txn_id: u64,
    /// Length of the valid prefix of the file
    pub valid_len: u64,
}

/// Replay the committed transactions in `path`
///
/// Missing files replay as empty. A torn tail ends the replay; everything
/// before it is kept and `valid_len` marks where it starts.
pub fn replay<F>(path: &Path, mut apply: F) -> Result<ReplayStats>
where
    F: FnMut(OwnedRecord) -> Result<()>,
{
    let mut stats = ReplayStats::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);

    let mut pending: Option<(u64, Vec<OwnedRecord>)> = None;
    let mut offset = 0u64;
    let mut committed_len = 0u64;

    loop {
        let (record, len) = match read_frame(&mut reader)? {
            Frame::Record(record, len) => (record, len),
            Frame::End => break,
            Frame::Torn(reason) => {
                warn!(path = %path.display(), offset, reason = %reason, "Log tail discarded");
                break;
            }
        };
        stats.frames += 1;
        offset += len as u64;

        match record {
            WalRecord::Begin { txn_id } => {
                if pending.is_some() {
                    stats.incomplete_txns += 1;
                }
                stats.last_txn_id = stats.last_txn_id.max(txn_id);
                pending = Some((txn_id, Vec::new()));
            }
            WalRecord::Commit { txn_id } => match pending.take() {
                Some((begin_id, records)) if begin_id == txn_id => {
                    for record in records {
                        apply(record)?;
                    }
                    stats.txns_applied += 1;
                    committed_len = offset;
                }
                _ => {
                    return Err(Error::Corruption(format!(
                        "commit for transaction {} without matching begin at offset {}",
                        txn_id, offset
                    )))
                }
            },
            other => match pending.as_mut() {
                Some((_, records)) => records.push(other),
                None => {
                    return Err(Error::Corruption(format!(
                        "record outside a transaction at offset {}",
                        offset
                    )))
                }
            },
        }
    }

    if pending.is_some() {
        stats.incomplete_txns += 1;
    }
    stats.valid_len = committed_len;
    Ok(stats)
}

/// Append-only log writer with durability handling
///
/// Each transaction arrives fully encoded and goes to the file in a single
/// write, so the writer keeps no buffer of its own.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    len: u64,
    durability: DurabilityMode,
}

impl WalWriter {
    /// Open the log at `path` for appending, creating it if needed
    pub fn open(path: &Path, durability: DurabilityMode) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            durability,
        })
    }

    /// Append pre-encoded frames making up one transaction
    ///
    /// The frames always reach the OS; `Full` durability also fsyncs.
    pub fn append(&mut self, frames: &[u8]) -> Result<()> {
        self.file.write_all(frames)?;
        if self.durability.requires_fsync() {
            self.file.sync_data()?;
        }
        self.len += frames.len() as u64;
        Ok(())
    }

    /// Discard the log contents
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        if self.durability.requires_fsync() {
            self.file.sync_data()?;
        }
        self.len = 0;
        Ok(())
    }

    /// Current log length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the log holds no frames
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
