//! # nestsync sync
//!
//! Keeps the materialized nested set tree in step with the node log.
//!
//! ## Components
//!
//! - [`LogWriter`]: appends captured snapshots, one "log updated" signal per batch
//! - [`NotificationSquasher`]: coalesces those signals into merge runs, one at a time
//! - [`LogMergeEngine`]: deduplicates pending entries, validates the
//!   prospective tree and commits it together with the cursor
//! - [`TreeReadModel`]: read-side cache invalidated on every commit
//! - [`SyncPipeline`]: wires the above at construction time
//!
//! The pure merge step lives in [`merge`] and is usable without any runtime.

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod log_writer;
pub mod merge;
pub mod pipeline;
pub mod read_model;
pub mod runtime;
pub mod squasher;

pub use config::SyncConfig;
pub use engine::LogMergeEngine;
pub use errors::{ConfigError, SyncError};
pub use log_writer::LogWriter;
pub use merge::{MergeOutcome, MergeResult};
pub use pipeline::SyncPipeline;
pub use read_model::TreeReadModel;
pub use runtime::{CancelSource, TokioTaskSpawner};
pub use squasher::{MergeTask, NotificationSquasher, SquasherState, SquasherStats};
