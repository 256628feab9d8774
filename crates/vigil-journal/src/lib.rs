//! Persistent change history
//!
//! This crate provides:
//! - An append-only change log (sled embedded DB)
//! - Query helpers: by id, latest, last N, since timestamp, per path

pub mod log;

// Re-exports
pub use log::{ChangeLog, JournalError};
