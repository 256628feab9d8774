//! Command implementations

pub mod log;
pub mod status;
pub mod watch;
