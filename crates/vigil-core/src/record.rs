//! Change records
//!
//! One immutable record per processed event. Records are append-only:
//! nothing in vigil ever updates or deletes one once written.

use crate::diff::{classify, DiffStats, Magnitude};
use crate::path::RelPath;
use serde::{Deserialize, Serialize};

/// What kind of event produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Modified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
        }
    }
}

/// One row of the append-only change log.
///
/// The `size_*` fields are nullable in the schema. vigil itself always
/// writes them (created events carry an explicit zero baseline), but
/// readers must not assume every historical row has them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Event detection time, RFC 3339 UTC.
    pub timestamp: String,
    /// Path relative to the watched root.
    pub path: RelPath,
    pub event: EventKind,
    pub size_before: Option<u64>,
    pub size_after: Option<u64>,
    pub size_delta: Option<i64>,
    pub lines_added: u32,
    pub lines_deleted: u32,
    /// Always `lines_added + lines_deleted`.
    pub lines_changed: u32,
}

impl ChangeRecord {
    /// Build a record from diff output stamped at `timestamp`.
    pub fn from_diff(timestamp: String, path: RelPath, stats: &DiffStats) -> Self {
        Self {
            timestamp,
            path,
            event: stats.kind,
            size_before: Some(stats.size_before),
            size_after: Some(stats.size_after),
            size_delta: Some(stats.size_delta),
            lines_added: stats.lines_added,
            lines_deleted: stats.lines_deleted,
            lines_changed: stats.lines_changed(),
        }
    }

    /// Magnitude is derived from the size fields, not stored in the row.
    pub fn magnitude(&self) -> Magnitude {
        match (self.size_before, self.size_after) {
            (Some(before), Some(after)) => classify(before, after),
            _ => Magnitude::Normal,
        }
    }
}
