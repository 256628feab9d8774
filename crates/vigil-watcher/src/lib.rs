//! Filesystem watching for vigil
//!
//! This crate turns platform file notifications into a calm, typed stream:
//!
//! - notify backend normalized to `RawEvent { path, kind }`
//! - Per-path debouncing with kind coalescing (`debounce`)
//! - Path eligibility rules shared with the tracker (`filter`)
//!
//! The notify callback runs on the backend's own thread, so events hop
//! through a bounded crossbeam channel and a bridge thread before landing
//! in the async world. A full channel drops events rather than blocking
//! the backend.

pub mod debounce;
pub mod filter;

pub use filter::{FilterConfig, FilterError, PathFilter};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// What happened to a path, as far as vigil cares.
///
/// Renames, removals and metadata-only changes all surface as `Other`;
/// downstream stages drop them without touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    Modified,
    Other,
}

impl RawEventKind {
    /// Combine two kinds seen for the same path inside one debounce
    /// window. A create anywhere in the burst makes the whole burst a
    /// create; otherwise any modification wins over `Other`.
    pub fn coalesce(self, other: RawEventKind) -> RawEventKind {
        use RawEventKind::*;
        match (self, other) {
            (Created, _) | (_, Created) => Created,
            (Modified, _) | (_, Modified) => Modified,
            (Other, Other) => Other,
        }
    }
}

/// One normalized notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: RawEventKind,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to start filesystem watcher: {0}")]
    Backend(#[from] notify::Error),
}

/// Keeps the platform watcher and its bridge thread alive.
///
/// Dropping the handle stops intake: the backend watcher is torn down,
/// the bridge drains and exits, and the debounced stream ends after
/// releasing whatever was pending.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    _bridge: std::thread::JoinHandle<()>,
}

/// Watch `root` recursively and return a debounced stream of raw events.
///
/// Directory events are dropped at the source; only file paths flow
/// downstream. Must be called from within a tokio runtime.
pub fn watch_root(
    root: &Path,
    window: Duration,
) -> Result<(WatcherHandle, mpsc::Receiver<RawEvent>), WatchError> {
    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<RawEvent>(1024);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let Some(kind) = map_kind(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    if path.is_dir() {
                        continue;
                    }
                    if raw_tx.try_send(RawEvent { path, kind }).is_err() {
                        tracing::warn!("notification queue full, dropping event");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "watch backend error"),
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let (async_tx, async_rx) = mpsc::channel::<RawEvent>(1024);
    let bridge = std::thread::spawn(move || {
        while let Ok(ev) = raw_rx.recv() {
            if async_tx.blocking_send(ev).is_err() {
                break;
            }
        }
    });

    let debounced = debounce::spawn(async_rx, window);
    Ok((
        WatcherHandle {
            _watcher: watcher,
            _bridge: bridge,
        },
        debounced,
    ))
}

/// Map a backend event kind onto vigil's three-way split.
///
/// `None` means not worth forwarding at all (access notifications).
/// Pure metadata changes and removals are forwarded as `Other` so the
/// downstream contract stays exercised, but they never reach the disk.
fn map_kind(kind: &EventKind) -> Option<RawEventKind> {
    match kind {
        EventKind::Create(_) => Some(RawEventKind::Created),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
            Some(RawEventKind::Modified)
        }
        EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Metadata(_)) => {
            Some(RawEventKind::Other)
        }
        EventKind::Remove(_) => Some(RawEventKind::Other),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(RawEventKind::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_coalesce_created_dominates() {
        use RawEventKind::*;
        assert_eq!(Created.coalesce(Modified), Created);
        assert_eq!(Modified.coalesce(Created), Created);
        assert_eq!(Other.coalesce(Created), Created);
        assert_eq!(Modified.coalesce(Other), Modified);
        assert_eq!(Other.coalesce(Other), Other);
    }

    #[test]
    fn test_map_kind_split() {
        assert_eq!(
            map_kind(&EventKind::Create(CreateKind::File)),
            Some(RawEventKind::Created)
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(RawEventKind::Modified)
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Any)),
            Some(RawEventKind::Modified)
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            Some(RawEventKind::Other)
        );
        assert_eq!(
            map_kind(&EventKind::Remove(RemoveKind::File)),
            Some(RawEventKind::Other)
        );
        assert_eq!(map_kind(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_root_sees_new_file() {
        let tmp = TempDir::new().unwrap();
        let result = watch_root(tmp.path(), Duration::from_millis(50));
        let (handle, mut rx) = match result {
            Ok(pair) => pair,
            Err(e) => {
                // Some sandboxes have no usable backend; nothing to assert.
                eprintln!("watch backend unavailable: {e}");
                return;
            }
        };

        let target = tmp.path().join("hello.txt");
        fs::write(&target, "hello\n").unwrap();

        let mut saw_target = false;
        while let Ok(Some(ev)) =
            tokio::time::timeout(Duration::from_secs(3), rx.recv()).await
        {
            if ev.path == target {
                saw_target = true;
                break;
            }
        }
        assert!(saw_target, "expected an event for {}", target.display());
        drop(handle);
    }
}
