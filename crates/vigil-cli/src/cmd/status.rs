//! Show journal and shadow store summary

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use vigil_core::ShadowStore;
use vigil_journal::ChangeLog;
use vigil_tracker::config::{DEFAULT_JOURNAL, DEFAULT_SHADOW, VIGIL_DIR};

pub async fn run() -> Result<()> {
    // 1. Find the watched root
    let root = util::find_watch_root()?;
    let vigil_dir = root.join(VIGIL_DIR);
    let journal_path = vigil_dir.join(DEFAULT_JOURNAL);
    let shadow_dir = vigil_dir.join(DEFAULT_SHADOW);

    // 2. Journal stats
    let log = ChangeLog::open(&journal_path).with_context(|| {
        format!(
            "opening change journal at {} (is a watch session holding it?)",
            journal_path.display()
        )
    })?;
    let latest = log.latest()?;
    let record_count = log.len();
    let journal_size = util::calculate_dir_size(&journal_path)?;

    // 3. Shadow store stats
    let shadow = ShadowStore::open(&shadow_dir)?;
    let entry_count = shadow.entry_count()?;
    let shadow_size = util::calculate_dir_size(&shadow_dir)?;

    // 4. Display
    println!("{}", "Watch Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Root:        {}", root.display().to_string().cyan());
    println!();
    println!("Journal:     {}", journal_path.display());
    println!("  Records:   {record_count}");
    match latest {
        Some((id, record)) => {
            println!("  Latest:    #{id} at {}", record.timestamp);
            println!("             {} ({})", record.path.cyan(), record.event.as_str());
        }
        None => println!("  Latest:    {}", "no changes recorded yet".dimmed()),
    }
    println!("  Size:      {}", util::format_size(journal_size));
    println!();
    println!("Shadow:      {}", shadow_dir.display());
    println!("  Entries:   {entry_count}");
    println!("  Size:      {}", util::format_size(shadow_size));

    Ok(())
}
