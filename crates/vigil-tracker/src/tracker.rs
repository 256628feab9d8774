//! Event tracker
//!
//! `Tracker` owns one watch session's state: the path filter, the shadow
//! store, the change journal, the per-path lock registry and the binary
//! exclusion set. `process` drives a single raw event through the whole
//! read-diff-append-reshadow critical section; the worker pool in
//! `pipeline` is a thin loop on top of it.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use vigil_core::{
    diff, probe, ChangeRecord, ContentKind, PathKey, RelPath, ShadowError, ShadowStore,
};
use vigil_journal::{ChangeLog, JournalError};
use vigil_watcher::{FilterConfig, PathFilter, RawEvent, RawEventKind};

use crate::config::WatchConfig;

/// Per-event failures. None of these stop the session except a fatal
/// persistence error, which the pipeline escalates.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Content kept changing (or stayed unreadable) through the retry.
    #[error("unstable read of {path}: {source}")]
    TransientRead {
        path: RelPath,
        #[source]
        source: io::Error,
    },

    /// The content probe saw binary bytes; the path is excluded for the
    /// rest of the session.
    #[error("binary content in {path}, excluded from tracking")]
    BinaryContent { path: RelPath },

    /// Snapshot read or write failed.
    #[error(transparent)]
    Shadow(#[from] ShadowError),

    /// The record was not durably appended. The shadow is left untouched
    /// so the same diff is recomputed on the next event for the path.
    #[error(transparent)]
    Persistence(#[from] JournalError),
}

impl TrackError {
    /// True when the journal medium itself failed and the session must
    /// stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            TrackError::Persistence(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// What became of one event.
#[derive(Debug, Clone)]
pub enum Outcome {
    Recorded(ChangeNotice),
    Skipped(SkipReason),
}

/// Why an event produced no record. Expected outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Kind carries no content change (rename, delete, metadata).
    Unhandled,
    /// Path is outside the root or rejected by the filter.
    Filtered,
    /// Path was classified binary earlier in the session.
    Excluded,
    /// File was gone by the time it was read.
    Vanished,
}

/// Emitted after every successful append, for console reporting.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub seq: u64,
    pub record: ChangeRecord,
}

/// Counters for one watch session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub records_written: u64,
    pub events_skipped: u64,
    pub errors: u64,
    /// Set when the session stopped because of a storage failure.
    pub fatal: bool,
}

pub struct Tracker {
    config: WatchConfig,
    filter: PathFilter,
    shadow: ShadowStore,
    journal: ChangeLog,

    /// One async mutex per path ever seen; serializes the critical
    /// section even for direct `process` callers.
    locks: DashMap<RelPath, Arc<tokio::sync::Mutex<()>>>,

    /// Paths found to contain binary content. Cleared only by restart.
    excluded: DashSet<RelPath>,

    notice_tx: Option<mpsc::Sender<ChangeNotice>>,
    stats: Mutex<SessionStats>,
}

impl Tracker {
    /// Open a session: canonicalize the root, build the filter, open the
    /// shadow store and the journal.
    pub fn open(config: WatchConfig) -> Result<Self> {
        let mut config = config;
        config.root = config
            .root
            .canonicalize()
            .with_context(|| format!("watch root {} is not accessible", config.root.display()))?;

        let reserved = reserved_locations(&config)?;
        let filter_config = FilterConfig {
            use_gitignore: config.use_gitignore,
            extra_patterns: config.extra_ignores.clone(),
        };
        let filter = PathFilter::load(&config.root, reserved, &filter_config)
            .context("building the path filter")?;

        let shadow = ShadowStore::open(&config.shadow_dir).with_context(|| {
            format!("opening shadow store at {}", config.shadow_dir.display())
        })?;
        let journal = ChangeLog::open(&config.journal_path).with_context(|| {
            format!("opening change journal at {}", config.journal_path.display())
        })?;

        Ok(Self {
            config,
            filter,
            shadow,
            journal,
            locks: DashMap::new(),
            excluded: DashSet::new(),
            notice_tx: None,
            stats: Mutex::new(SessionStats::default()),
        })
    }

    /// Create the notice stream. Call before sharing the tracker; the
    /// stream is lossy under backpressure, records are never lost.
    pub fn notice_stream(&mut self) -> mpsc::Receiver<ChangeNotice> {
        let (tx, rx) = mpsc::channel(1024);
        self.notice_tx = Some(tx);
        rx
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn journal(&self) -> &ChangeLog {
        &self.journal
    }

    pub fn shadow(&self) -> &ShadowStore {
        &self.shadow
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        self.stats.lock().clone()
    }

    pub fn flush(&self) -> Result<(), JournalError> {
        self.journal.flush()
    }

    pub(crate) fn mark_fatal(&self) {
        self.stats.lock().fatal = true;
    }

    /// Shard index for `path`. Paths outside the root land on shard 0;
    /// they become filter skips wherever they run.
    pub fn shard_for(&self, path: &Path, shards: usize) -> usize {
        match RelPath::under(&self.config.root, path) {
            Some(rel) => PathKey::of(&rel).shard(shards),
            None => 0,
        }
    }

    /// Drive one event through filtering, the per-path critical section,
    /// the journal and the shadow store.
    pub async fn process(&self, event: RawEvent) -> Result<Outcome, TrackError> {
        let result = self.process_inner(event).await;
        {
            let mut stats = self.stats.lock();
            match &result {
                Ok(Outcome::Recorded(_)) => stats.records_written += 1,
                Ok(Outcome::Skipped(_)) => stats.events_skipped += 1,
                Err(_) => stats.errors += 1,
            }
        }
        result
    }

    async fn process_inner(&self, event: RawEvent) -> Result<Outcome, TrackError> {
        if event.kind == RawEventKind::Other {
            return Ok(Outcome::Skipped(SkipReason::Unhandled));
        }

        let Some(rel) = RelPath::under(&self.config.root, &event.path) else {
            return Ok(Outcome::Skipped(SkipReason::Filtered));
        };
        if !self.filter.is_eligible(&rel) {
            return Ok(Outcome::Skipped(SkipReason::Filtered));
        }
        if self.excluded.contains(&rel) {
            return Ok(Outcome::Skipped(SkipReason::Excluded));
        }

        let lock = self.path_lock(&rel);
        let _guard = lock.lock().await;

        let content = match self.read_stable(&event.path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(Outcome::Skipped(SkipReason::Vanished)),
            Err(source) => return Err(TrackError::TransientRead { path: rel, source }),
        };

        if probe::classify(&content) == ContentKind::Binary {
            self.excluded.insert(rel.clone());
            return Err(TrackError::BinaryContent { path: rel });
        }

        let before = self.shadow.get(&rel)?;
        if before.is_none() {
            info!(path = %rel, "tracking new file");
        }

        let stats = diff(before.as_ref().map(|s| s.content.as_slice()), &content);
        let record = ChangeRecord::from_diff(now_timestamp(), rel.clone(), &stats);

        // Append before reshadowing: a failed append must leave the old
        // baseline in place.
        let seq = self.journal.append(&record)?;
        self.shadow.put(&rel, &content)?;

        let notice = ChangeNotice { seq, record };
        if let Some(tx) = &self.notice_tx {
            let _ = tx.try_send(notice.clone());
        }
        Ok(Outcome::Recorded(notice))
    }

    fn path_lock(&self, rel: &RelPath) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(rel.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Read the file with a stat-read-stat stability check, retrying once
    /// after a settle delay. `None` means the file is gone (or is not a
    /// regular file) and the event should be skipped silently.
    async fn read_stable(&self, abs: &Path) -> io::Result<Option<Vec<u8>>> {
        let mut last_err: Option<io::Error> = None;

        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(self.config.settle_retry).await;
            }
            match read_once(abs).await {
                Ok(ReadPass::Stable(bytes)) => return Ok(Some(bytes)),
                Ok(ReadPass::Gone) => return Ok(None),
                Ok(ReadPass::Unstable) => {
                    last_err = Some(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "content changed while reading",
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "unreadable file")))
    }
}

enum ReadPass {
    Stable(Vec<u8>),
    Gone,
    Unstable,
}

async fn read_once(abs: &Path) -> io::Result<ReadPass> {
    let before = match tokio::fs::metadata(abs).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReadPass::Gone),
        Err(e) => return Err(e),
    };
    // Directories are never tracked.
    if !before.is_file() {
        return Ok(ReadPass::Gone);
    }

    let bytes = match tokio::fs::read(abs).await {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReadPass::Gone),
        Err(e) => return Err(e),
    };

    let after = match tokio::fs::metadata(abs).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReadPass::Gone),
        Err(e) => return Err(e),
    };

    let stable =
        before.len() == after.len() && before.modified().ok() == after.modified().ok();
    if stable {
        Ok(ReadPass::Stable(bytes))
    } else {
        Ok(ReadPass::Unstable)
    }
}

/// Journal locations that sit inside the root must be invisible to the
/// filter even when they are not hidden directories.
fn reserved_locations(config: &WatchConfig) -> Result<Vec<RelPath>> {
    let cwd = std::env::current_dir().context("resolving the working directory")?;
    let mut reserved = Vec::new();
    for candidate in [&config.journal_path, &config.shadow_dir] {
        let abs = if candidate.is_absolute() {
            candidate.clone()
        } else {
            cwd.join(candidate)
        };
        if let Some(rel) = RelPath::under(&config.root, &abs) {
            reserved.push(rel);
        }
    }
    Ok(reserved)
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
