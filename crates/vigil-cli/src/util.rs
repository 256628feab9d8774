//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vigil_core::{ChangeRecord, EventKind, Magnitude};
use vigil_tracker::config::VIGIL_DIR;

/// Find the watch root by walking up from cwd to find .vigil/
pub fn find_watch_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir()
        .context("Failed to get current directory")?;

    loop {
        let vigil_dir = current.join(VIGIL_DIR);
        if vigil_dir.exists() && vigil_dir.is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!(
                "Not inside a watched directory (no .vigil directory found)"
            ),
        }
    }
}

/// Make a user-supplied path absolute against the current directory.
pub fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Ok(cwd.join(path))
    }
}

/// Render one change record in the report format:
///
/// ```text
/// [<timestamp>] <path> [<tag>]
///   Size: <before> → <after> bytes (<signed delta>)
///   Lines: +<added> -<deleted>
/// ```
pub fn render_change(record: &ChangeRecord) -> String {
    let tag = magnitude_tag(record);

    let before = record.size_before.unwrap_or(0);
    let after = record.size_after.unwrap_or(0);
    let delta = record.size_delta.unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "[{}] {}{}\n",
        record.timestamp.dimmed(),
        record.path.cyan(),
        tag
    ));
    out.push_str(&format!("  Size: {before} → {after} bytes ({delta:+})\n"));
    out.push_str(&format!(
        "  Lines: +{} -{}",
        record.lines_added, record.lines_deleted
    ));
    out
}

/// The bracketed severity tag, or an empty string for a plain change.
fn magnitude_tag(record: &ChangeRecord) -> String {
    if record.event == EventKind::Created {
        return format!(" [{}]", "CREATED".green().bold());
    }
    let delta = record.size_delta.unwrap_or(0);
    match record.magnitude() {
        Magnitude::Zeroed => format!(" [{}]", "FILE ZEROED OUT!".red().bold()),
        Magnitude::LargeDeletion => format!(
            " [{}]",
            format!("LARGE DELETION: -{} bytes", delta.unsigned_abs()).red()
        ),
        Magnitude::LargeAddition => {
            format!(" [{}]", format!("LARGE ADDITION: +{delta} bytes").green())
        }
        Magnitude::Normal => String::new(),
    }
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a session duration ("1h 03m 12s", "4m 05s", "12s", "3.4s")
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs >= 10 {
        format!("{secs}s")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Calculate directory size recursively
pub fn calculate_dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            total += entry.metadata()?.len();
        } else if path.is_dir() {
            total += calculate_dir_size(&path)?;
        }
    }

    Ok(total)
}
