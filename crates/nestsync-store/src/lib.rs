//! # nestsync store
//!
//! In-process implementation of [`nestsync_core::effects::NestedSetStore`].
//!
//! [`MemoryStore`] keeps the node log, the materialized node set and the
//! per-stream cursors behind a single lock so that a merge commit is applied
//! all at once. Its state can be written to and restored from a JSON file.

#![forbid(unsafe_code)]

mod memory;

pub use memory::{MemoryStore, StoreSnapshot};
