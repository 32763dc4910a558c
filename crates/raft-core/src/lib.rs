//! # raft-core
//!
//! why: stage raft log entries in memory between production and durability
//! relations: driven by the protocol layer, flushed through raft-storage
//! what: LogWindow with merge, durability watermark, compaction, snapshot slot

pub mod config;
pub mod error;
pub mod log;
pub mod message;
pub mod window;

pub use config::{ConfigError, WindowConfig};
pub use error::InvariantViolation;
pub use log::{LogEntry, Snapshot};
pub use message::UpdateCommit;
pub use window::LogWindow;
