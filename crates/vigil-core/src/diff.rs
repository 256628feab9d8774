//! Shadow-versus-current content diffing
//!
//! Pure computation: given the last-known content and the bytes now on
//! disk, produce the size delta, line-level add/delete counts, and a
//! coarse magnitude classification. No I/O happens here.

use crate::record::EventKind;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Severity of a change relative to the previous size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Normal,
    Zeroed,
    LargeDeletion,
    LargeAddition,
}

/// Everything the diff engine can say about one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub kind: EventKind,
    pub size_before: u64,
    pub size_after: u64,
    pub size_delta: i64,
    pub lines_added: u32,
    pub lines_deleted: u32,
    pub magnitude: Magnitude,
}

impl DiffStats {
    pub fn lines_changed(&self) -> u32 {
        self.lines_added + self.lines_deleted
    }
}

/// Classify by relative size movement.
///
/// Exactly one class applies; evaluation order is zeroed, large deletion,
/// large addition, normal, and the first match wins. Thresholds are
/// strict: removing exactly half is not "large", doubling exactly is not
/// "large". Arithmetic is widened so huge files cannot overflow.
pub fn classify(size_before: u64, size_after: u64) -> Magnitude {
    if size_after == 0 && size_before > 0 {
        return Magnitude::Zeroed;
    }
    if size_after < size_before && (size_before - size_after) as u128 * 2 > size_before as u128 {
        return Magnitude::LargeDeletion;
    }
    if size_before > 0 && size_after as u128 > size_before as u128 * 2 {
        return Magnitude::LargeAddition;
    }
    Magnitude::Normal
}

/// Diff last-known content against current content.
///
/// `before = None` means there was no shadow yet: the event is a creation,
/// every line counts as added, and the baseline size is zero. Content is
/// interpreted as UTF-8 lossily for line splitting; callers keep binary
/// data away from here via the content probe.
pub fn diff(before: Option<&[u8]>, after: &[u8]) -> DiffStats {
    let size_after = after.len() as u64;
    match before {
        None => DiffStats {
            kind: EventKind::Created,
            size_before: 0,
            size_after,
            size_delta: size_after as i64,
            lines_added: count_lines(after),
            lines_deleted: 0,
            magnitude: classify(0, size_after),
        },
        Some(before) => {
            let size_before = before.len() as u64;
            let (lines_added, lines_deleted) = line_counts(before, after);
            DiffStats {
                kind: EventKind::Modified,
                size_before,
                size_after,
                size_delta: size_after as i64 - size_before as i64,
                lines_added,
                lines_deleted,
                magnitude: classify(size_before, size_after),
            }
        }
    }
}

/// Insert/Delete line counts from a Myers LCS diff.
fn line_counts(before: &[u8], after: &[u8]) -> (u32, u32) {
    let old = String::from_utf8_lossy(before);
    let new = String::from_utf8_lossy(after);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

    let mut added = 0u32;
    let mut deleted = 0u32;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}

fn count_lines(content: &[u8]) -> u32 {
    String::from_utf8_lossy(content).lines().count() as u32
}
