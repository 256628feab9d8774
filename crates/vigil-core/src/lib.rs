//! Core primitives for vigil
//!
//! This crate provides:
//! - Normalized relative paths and the path-to-key hash
//! - Text/binary content classification
//! - The shadow snapshot store (durable "before" state)
//! - The diff engine and change record types

pub mod diff;
pub mod hash;
pub mod path;
pub mod probe;
pub mod record;
pub mod shadow;

// Re-exports
pub use diff::{diff, DiffStats, Magnitude};
pub use hash::PathKey;
pub use path::RelPath;
pub use probe::ContentKind;
pub use record::{ChangeRecord, EventKind};
pub use shadow::{ShadowError, ShadowStore, Snapshot};
