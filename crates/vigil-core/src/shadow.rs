//! Durable shadow snapshots
//!
//! The shadow store holds the last-known content of every tracked file,
//! which becomes the synthetic "before" state for the next diff. Each
//! snapshot is a single file addressed by the path's BLAKE3 key, fanned
//! out by the first two hex characters:
//!
//! ```text
//! .vigil/shadow/
//!   tmp/                staging for atomic writes
//!   3f/9a..e2           one snapshot per tracked path
//! ```
//!
//! Snapshot format: magic `VSH1`, u16-LE path length, the UTF-8 relative
//! path (recorded for operator inspection), then the raw content bytes.
//! `put` stages to `tmp/`, fsyncs, renames into place, and fsyncs the
//! parent directory, so a snapshot is durable before `put` returns and a
//! reader never observes a half-written one.

use crate::hash::PathKey;
use crate::path::RelPath;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

const MAGIC: &[u8; 4] = b"VSH1";
const TMP_DIR: &str = "tmp";

/// Shadow store failures. I/O trouble is reported as `Unavailable`, never
/// silently mapped to "no snapshot": fabricating an empty baseline would
/// turn a genuine large deletion into a false creation.
#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("shadow store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt snapshot at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },
}

/// A stored snapshot: the recorded relative path plus its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: String,
    pub content: Vec<u8>,
}

/// Snapshot store rooted at one directory, safe for concurrent use across
/// distinct keys. Per-key exclusivity is the caller's job.
pub struct ShadowStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl ShadowStore {
    /// Open a shadow store at `dir`, creating the layout if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ShadowError> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(TMP_DIR)).map_err(|e| ShadowError::Unavailable {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk location for a key's snapshot: `<dir>/<hh>/<rest>`.
    pub fn snapshot_path(&self, key: &PathKey) -> PathBuf {
        let hex = key.to_hex();
        self.dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Last snapshot for `path`, or `None` if none was ever recorded.
    pub fn get(&self, path: &RelPath) -> Result<Option<Snapshot>, ShadowError> {
        let loc = self.snapshot_path(&PathKey::of(path));
        let raw = match fs::read(&loc) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ShadowError::Unavailable {
                    path: loc,
                    source: e,
                })
            }
        };
        decode_snapshot(&loc, raw).map(Some)
    }

    /// Replace the snapshot for `path`. Durable before this returns.
    pub fn put(&self, path: &RelPath, content: &[u8]) -> Result<(), ShadowError> {
        let target = self.snapshot_path(&PathKey::of(path));
        let name = path.as_str().as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| ShadowError::Corrupt {
            path: target.clone(),
            detail: "path too long for snapshot header".to_string(),
        })?;

        let mut data = Vec::with_capacity(MAGIC.len() + 2 + name.len() + content.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&name_len.to_le_bytes());
        data.extend_from_slice(name);
        data.extend_from_slice(content);

        self.atomic_write(&target, &data)
    }

    /// Whether a snapshot has ever been recorded for `path`.
    pub fn contains(&self, path: &RelPath) -> bool {
        self.snapshot_path(&PathKey::of(path)).exists()
    }

    /// Number of snapshots on disk, staging files excluded.
    pub fn entry_count(&self) -> Result<usize, ShadowError> {
        let mut count = 0;
        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != TMP_DIR);
        for entry in walker {
            let entry = entry.map_err(|e| ShadowError::Unavailable {
                path: self.dir.clone(),
                source: io::Error::from(e),
            })?;
            if entry.file_type().is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Write to a unique staging file, fsync, rename over `target`, fsync
    /// the parent directory.
    fn atomic_write(&self, target: &Path, data: &[u8]) -> Result<(), ShadowError> {
        let unavailable = |e: io::Error| ShadowError::Unavailable {
            path: target.to_path_buf(),
            source: e,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let tmp = self.dir.join(TMP_DIR).join(format!(
            "{}.{}.tmp",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        let staged = (|| -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&tmp, target)?;
            Ok(())
        })();
        if let Err(e) = staged {
            let _ = fs::remove_file(&tmp);
            return Err(unavailable(e));
        }

        #[cfg(unix)]
        if let Some(parent) = target.parent() {
            File::open(parent)
                .and_then(|d| d.sync_all())
                .map_err(unavailable)?;
        }

        Ok(())
    }
}

fn decode_snapshot(loc: &Path, raw: Vec<u8>) -> Result<Snapshot, ShadowError> {
    let corrupt = |detail: &str| ShadowError::Corrupt {
        path: loc.to_path_buf(),
        detail: detail.to_string(),
    };

    if raw.len() < MAGIC.len() + 2 || &raw[..MAGIC.len()] != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let name_len = u16::from_le_bytes([raw[4], raw[5]]) as usize;
    let content_start = MAGIC.len() + 2 + name_len;
    if raw.len() < content_start {
        return Err(corrupt("truncated path header"));
    }
    let path = std::str::from_utf8(&raw[MAGIC.len() + 2..content_start])
        .map_err(|_| corrupt("recorded path is not UTF-8"))?
        .to_string();

    Ok(Snapshot {
        path,
        content: raw[content_start..].to_vec(),
    })
}
