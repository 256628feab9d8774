//! Watch a directory and record every file change

use crate::settings::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vigil_tracker::{spawn_pipeline, Tracker, WatchConfig};
use vigil_watcher::watch_root;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    path: Option<PathBuf>,
    journal: Option<PathBuf>,
    shadow_dir: Option<PathBuf>,
    debounce_ms: Option<u64>,
    workers: Option<usize>,
    no_gitignore: bool,
    ignore: Vec<String>,
) -> Result<()> {
    // 1. Resolve the root and fold in file settings, then flags.
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    let root = root
        .canonicalize()
        .with_context(|| format!("watch path {} is not accessible", root.display()))?;

    let mut config = WatchConfig::new(&root);
    Settings::load(&root)?.apply(&mut config);

    if let Some(journal) = journal {
        config.journal_path = util::absolutize(journal)?;
    }
    if let Some(shadow) = shadow_dir {
        config.shadow_dir = util::absolutize(shadow)?;
    }
    if let Some(ms) = debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }
    if no_gitignore {
        config.use_gitignore = false;
    }
    config.extra_ignores.extend(ignore);

    // 2. Open the session and announce it.
    let mut tracker = Tracker::open(config).context("starting the watch session")?;
    let mut notices = tracker.notice_stream();
    let tracker = Arc::new(tracker);

    let config = tracker.config();
    println!("{}", "vigil".bold());
    println!("Watching:   {}", config.root.display().to_string().cyan());
    println!("Journal:    {}", config.journal_path.display());
    println!("Shadow:     {}", config.shadow_dir.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Monitoring started. Press Ctrl+C to stop.");
    println!();

    // 3. Wire watcher -> pipeline, plus the console printer.
    let started = Instant::now();
    let (watcher, events) = watch_root(&config.root, config.debounce)
        .context("starting the filesystem watcher")?;
    let handle = spawn_pipeline(tracker.clone(), events);

    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("{}", util::render_change(&notice.record));
        }
    });

    // 4. Run until Ctrl+C or an internal stop (fatal storage failure).
    let mut stopped = handle.stopped();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Stopping vigil...");
        }
        _ = stopped.wait_for(|stopping| *stopping) => {
            tracing::warn!("watch session stopping early");
        }
    }

    // 5. Stop intake first, then drain and flush.
    drop(watcher);
    let stats = handle.shutdown().await?;
    drop(tracker);
    let _ = printer.await;

    println!();
    println!("Session summary");
    println!("  Records:  {}", stats.records_written);
    println!("  Skipped:  {}", stats.events_skipped);
    println!("  Errors:   {}", stats.errors);
    println!("  Duration: {}", util::format_duration(started.elapsed()));

    if stats.fatal {
        anyhow::bail!("session stopped after an unrecoverable storage failure");
    }
    Ok(())
}
