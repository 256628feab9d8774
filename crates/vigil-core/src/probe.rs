//! Text or binary content classification
//!
//! Tracking and diffing only make sense for text, so every read goes
//! through this probe first. Classification inspects a capped prefix of
//! the content: a null byte or invalid UTF-8 marks it binary. The cap
//! keeps the probe cheap for arbitrarily large files.

/// Number of leading bytes the probe inspects.
pub const PROBE_CAP: usize = 8192;

/// Result of classifying a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Binary,
}

impl ContentKind {
    pub fn is_text(&self) -> bool {
        matches!(self, ContentKind::Text)
    }
}

/// Classify content by examining at most [`PROBE_CAP`] leading bytes.
///
/// Empty content is text. A null byte anywhere in the prefix is binary.
/// The prefix must otherwise decode as UTF-8; a multibyte sequence split
/// by the cap itself is tolerated.
pub fn classify(content: &[u8]) -> ContentKind {
    let prefix = &content[..content.len().min(PROBE_CAP)];
    if prefix.contains(&0) {
        return ContentKind::Binary;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => ContentKind::Text,
        Err(e) => {
            // error_len() is None only for a sequence cut short at the end
            // of the prefix. That is fine when the cut is ours (content
            // longer than the cap), invalid when the file really ends there.
            if e.error_len().is_none() && content.len() > PROBE_CAP {
                ContentKind::Text
            } else {
                ContentKind::Binary
            }
        }
    }
}
