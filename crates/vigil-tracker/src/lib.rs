//! Change-tracking pipeline for vigil
//!
//! Ties the other crates together: debounced raw events come in, filtered
//! paths are read and diffed against their shadow snapshots, records are
//! appended to the journal, and fresh snapshots replace the baselines.
//!
//! The crate exposes two layers:
//!
//! - `Tracker` processes one event at a time and is safe to call
//!   concurrently (per-path locking is internal)
//! - `spawn_pipeline` runs a sharded worker pool over an event stream
//!   with cooperative shutdown
//!
//! All configuration travels in an explicit [`WatchConfig`]; a process
//! can run any number of independent sessions.

pub mod config;
pub mod pipeline;
pub mod tracker;

pub use config::WatchConfig;
pub use pipeline::{spawn_pipeline, TrackerHandle};
pub use tracker::{
    ChangeNotice, Outcome, SessionStats, SkipReason, TrackError, Tracker,
};
