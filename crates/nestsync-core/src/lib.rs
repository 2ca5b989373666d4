//! # nestsync core
//!
//! Foundation types for keeping a materialized nested set tree in sync with
//! an append-only log of node snapshots.
//!
//! ## Contents
//!
//! - [`types`]: `Node`, `LogEntry`, `Cursor` and their identifiers
//! - [`tree`]: pure validation and reconstruction of a tree from a flat set
//! - [`effects`]: storage, task spawning and signal contracts (no implementations)
//! - [`capture`]: decoding of records published by the capture connector
//! - [`errors`]: error types shared by every layer
//!
//! ## Nested set invariant
//!
//! A node set of size `N` is valid when its `2N` boundaries are exactly
//! `1..=2N`, every node has `left < right`, and any two nodes are either
//! disjoint or strictly nested.

#![forbid(unsafe_code)]

pub mod capture;
pub mod effects;
pub mod errors;
pub mod tree;
pub mod types;

pub use errors::{CaptureError, StoreError, TreeError};
pub use tree::{build, TreeNode};
pub use types::{Cursor, LogEntry, LogId, Node, NodeId, DEFAULT_LOG_STREAM};
