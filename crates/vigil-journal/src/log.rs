//! Append-only change log using sled
//!
//! One bincode-encoded [`ChangeRecord`] per entry, keyed by a big-endian
//! auto-incrementing id so that sled's key order is record order. Every
//! append is flushed before it returns; a record handed back to the
//! caller has reached disk.

use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use vigil_core::{ChangeRecord, RelPath};

/// Change log failures.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("change log storage error: {0}")]
    Store(#[from] sled::Error),
    #[error("change log codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl JournalError {
    /// Whether this failure means the log medium itself is gone bad
    /// (corruption, I/O); such errors end the watch session instead of
    /// being retried per event.
    pub fn is_fatal(&self) -> bool {
        match self {
            JournalError::Store(e) => matches!(
                e,
                sled::Error::Corruption { .. }
                    | sled::Error::Io(_)
                    | sled::Error::ReportableBug(_)
                    | sled::Error::Unsupported(_)
            ),
            JournalError::Codec(_) => false,
        }
    }
}

/// Append-only log of change records.
///
/// Safe for concurrent appends; ids are monotonic (gaps possible after a
/// crash, order never violated). Rows are never updated or deleted.
pub struct ChangeLog {
    db: Db,
    seq_counter: AtomicU64,
}

impl ChangeLog {
    /// Open or create a change log at the given path.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let db = sled::open(path)?;

        // Ids restart after the highest key already on disk.
        let next_seq = match db.last()? {
            Some((key, _)) => decode_seq(&key) + 1,
            None => 1,
        };

        Ok(Self {
            db,
            seq_counter: AtomicU64::new(next_seq),
        })
    }

    /// Append a record, returning its assigned id. Durable on return.
    pub fn append(&self, record: &ChangeRecord) -> Result<u64, JournalError> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let value = bincode::serialize(record)?;

        self.db.insert(seq.to_be_bytes(), value)?;
        self.db.flush()?;

        Ok(seq)
    }

    /// Fetch one record by id.
    pub fn get(&self, seq: u64) -> Result<Option<ChangeRecord>, JournalError> {
        match self.db.get(seq.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// The most recent record, if any.
    pub fn latest(&self) -> Result<Option<(u64, ChangeRecord)>, JournalError> {
        match self.db.last()? {
            Some((key, value)) => Ok(Some((decode_seq(&key), bincode::deserialize(&value)?))),
            None => Ok(None),
        }
    }

    /// The last `count` records in ascending id order.
    pub fn last_n(&self, count: usize) -> Result<Vec<(u64, ChangeRecord)>, JournalError> {
        let mut out = Vec::with_capacity(count.min(64));
        for item in self.db.iter().rev().take(count) {
            let (key, value) = item?;
            out.push((decode_seq(&key), bincode::deserialize(&value)?));
        }
        out.reverse();
        Ok(out)
    }

    /// Records at or after `cutoff`, ascending.
    ///
    /// `cutoff` must use the same RFC 3339 UTC rendering the writer uses;
    /// the comparison is lexicographic, which matches chronological order
    /// for a uniform format.
    pub fn since(&self, cutoff: &str) -> Result<Vec<(u64, ChangeRecord)>, JournalError> {
        let mut out = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            let record: ChangeRecord = bincode::deserialize(&value)?;
            if record.timestamp.as_str() >= cutoff {
                out.push((decode_seq(&key), record));
            }
        }
        Ok(out)
    }

    /// All records for one path, ascending.
    pub fn for_path(&self, path: &RelPath) -> Result<Vec<(u64, ChangeRecord)>, JournalError> {
        let mut out = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            let record: ChangeRecord = bincode::deserialize(&value)?;
            if record.path == *path {
                out.push((decode_seq(&key), record));
            }
        }
        Ok(out)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Force outstanding writes to disk.
    pub fn flush(&self) -> Result<(), JournalError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_seq(key: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = key.len().min(8);
    buf[8 - len..].copy_from_slice(&key[..len]);
    u64::from_be_bytes(buf)
}
