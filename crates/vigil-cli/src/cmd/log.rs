//! Show recorded changes

use crate::util;
use anyhow::{Context, Result};
use serde::Serialize;
use vigil_core::{ChangeRecord, RelPath};
use vigil_journal::ChangeLog;
use vigil_tracker::config::{DEFAULT_JOURNAL, VIGIL_DIR};

#[derive(Serialize)]
struct JsonRow<'a> {
    id: u64,
    #[serde(flatten)]
    record: &'a ChangeRecord,
}

pub async fn run(limit: Option<usize>, file: Option<String>, json: bool) -> Result<()> {
    let root = util::find_watch_root()?;
    let journal_path = root.join(VIGIL_DIR).join(DEFAULT_JOURNAL);
    let log = ChangeLog::open(&journal_path).with_context(|| {
        format!(
            "opening change journal at {} (is a watch session holding it?)",
            journal_path.display()
        )
    })?;

    let limit = limit.unwrap_or(20);
    let rows = match file {
        Some(raw) => {
            let rel =
                RelPath::new(&raw).with_context(|| format!("invalid relative path '{raw}'"))?;
            let mut rows = log.for_path(&rel)?;
            if rows.len() > limit {
                rows = rows.split_off(rows.len() - limit);
            }
            rows
        }
        None => log.last_n(limit)?,
    };

    if rows.is_empty() {
        println!("No changes recorded yet.");
        return Ok(());
    }

    if json {
        for (id, record) in &rows {
            let line = serde_json::to_string(&JsonRow { id: *id, record })?;
            println!("{line}");
        }
        return Ok(());
    }

    // Oldest first, the order they happened.
    for (_, record) in &rows {
        println!("{}", util::render_change(record));
    }
    Ok(())
}
