//! # nestsync testkit
//!
//! Fixtures shared by the nestsync test suites.
//!
//! - [`builders`]: terse constructors for nodes and log entries
//! - [`source`]: [`SourceTree`], a simulator of the source side that produces
//!   the same snapshot stream the capture connector would
//! - [`strategies`]: proptest strategies for valid nested sets
//! - [`faults`]: a [`NestedSetStore`](nestsync_core::effects::NestedSetStore)
//!   wrapper that fails on demand

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod builders;
pub mod faults;
pub mod source;
pub mod strategies;

pub use builders::{log_entries, node, LogBuilder, TEST_EPOCH};
pub use faults::{FailingStore, FaultPlan};
pub use source::SourceTree;

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
