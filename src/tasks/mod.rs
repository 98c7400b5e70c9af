//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: sweeps expired Entry Store items at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
