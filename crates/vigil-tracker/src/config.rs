//! Watch session configuration
//!
//! One `WatchConfig` value describes one session. Callers (the CLI, tests)
//! build it explicitly and hand it to the tracker; nothing in this
//! workspace reads configuration from process globals, so several
//! independent sessions can coexist in one process.

use std::path::PathBuf;
use std::time::Duration;
use vigil_watcher::debounce::DEFAULT_WINDOW;

/// Directory under the watched root holding vigil's own state.
pub const VIGIL_DIR: &str = ".vigil";

/// Default journal location relative to `VIGIL_DIR`.
pub const DEFAULT_JOURNAL: &str = "changes.db";

/// Default shadow store location relative to `VIGIL_DIR`.
pub const DEFAULT_SHADOW: &str = "shadow";

const DEFAULT_SETTLE_RETRY: Duration = Duration::from_millis(100);
const MAX_DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Root of the watched tree. Canonicalized when the tracker opens.
    pub root: PathBuf,

    /// Where change records are appended.
    pub journal_path: PathBuf,

    /// Where content snapshots live.
    pub shadow_dir: PathBuf,

    /// Quiet window collapsing a notification burst into one event.
    pub debounce: Duration,

    /// Worker shard count for the pipeline.
    pub workers: usize,

    /// Honor the root's `.gitignore`.
    pub use_gitignore: bool,

    /// Extra gitignore-style patterns supplied by the operator.
    pub extra_ignores: Vec<String>,

    /// Delay before retrying an unstable content read.
    pub settle_retry: Duration,
}

impl WatchConfig {
    /// Configuration with defaults for everything but the root.
    ///
    /// Journal and shadow locations default to `<root>/.vigil/`; pass an
    /// absolute root if you override them with absolute paths elsewhere,
    /// so the reserved-location filtering can line them up.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let vigil = root.join(VIGIL_DIR);
        Self {
            journal_path: vigil.join(DEFAULT_JOURNAL),
            shadow_dir: vigil.join(DEFAULT_SHADOW),
            root,
            debounce: DEFAULT_WINDOW,
            workers: default_workers(),
            use_gitignore: true,
            extra_ignores: Vec::new(),
            settle_retry: DEFAULT_SETTLE_RETRY,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_WORKERS)
}
