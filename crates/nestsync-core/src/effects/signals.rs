//! Change signals flowing through the synchronization pipeline.
//!
//! ```text
//! log writer ──on_log_batch_written()──> squasher ──> merge engine
//!                                                        │
//!             read-side caches <──on_tree_updated()──────┘
//! ```
//!
//! Listeners are registered explicitly when the pipeline is assembled.

/// Receives one call per batch of log entries appended to the store.
pub trait LogUpdateListener: Send + Sync {
    /// New log entries are available. Must not block.
    fn on_log_batch_written(&self);
}

/// Receives one call per successful merge commit.
pub trait TreeUpdateListener: Send + Sync {
    /// The materialized node set changed. Runs on the merge worker, so
    /// implementations only invalidate state.
    fn on_tree_updated(&self);
}
