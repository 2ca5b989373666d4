//! Error types shared by the nested set crates.

use crate::types::{Cursor, LogId, NodeId};
use thiserror::Error;

/// Structural validation failure of a flat node set.
///
/// A rejected node set is an expected, transient condition while the log is
/// still catching up (for example a child snapshot that arrived before the
/// snapshot widening its parent), not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No nodes at all
    #[error("empty node set")]
    Empty,

    /// Two nodes open at the same position
    #[error("duplicate left coordinate {left}")]
    DuplicateLeft {
        /// The repeated coordinate
        left: u32,
    },

    /// Two nodes close at the same position
    #[error("duplicate right coordinate {right}")]
    DuplicateRight {
        /// The repeated coordinate
        right: u32,
    },

    /// A coordinate is used as both a left and a right boundary
    #[error("coordinate {coordinate} is shared between nodes")]
    SharedCoordinate {
        /// The reused coordinate
        coordinate: u32,
    },

    /// Coordinates do not span exactly `[1, 2N]`
    #[error("coordinates span {min}..={max}, expected 1..={expected}")]
    CoordinateRange {
        /// Smallest coordinate found
        min: u64,
        /// Largest coordinate found
        max: u64,
        /// Twice the node count
        expected: u64,
    },

    /// A node closes before it opens
    #[error("{id} has left {left} >= right {right}")]
    InvertedBounds {
        /// Offending node
        id: NodeId,
        /// Its left coordinate
        left: u32,
        /// Its right coordinate
        right: u32,
    },

    /// A node opens inside a sibling subtree that is already closed
    #[error("{id} overlaps the subtree of {sibling}")]
    Overlap {
        /// Offending node
        id: NodeId,
        /// Sibling whose boundaries it crosses
        sibling: NodeId,
    },

    /// No open ancestor encloses the node
    #[error("{id} has no enclosing parent")]
    Unparentable {
        /// Offending node
        id: NodeId,
    },
}

/// Failure of the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend I/O failure
    #[error("storage backend failed: {message}")]
    Backend {
        /// Backend specific description
        message: String,
    },

    /// Insert of a node id that is already persisted
    #[error("{id} is already persisted")]
    DuplicateNode {
        /// Offending node
        id: NodeId,
    },

    /// Update of a node id that is not persisted
    #[error("{id} is not persisted")]
    NodeNotFound {
        /// Offending node
        id: NodeId,
    },

    /// Attempt to move a cursor backwards
    #[error("cursor for {stream} cannot move from {current} to {requested}")]
    CursorRegression {
        /// Log stream name
        stream: String,
        /// Persisted cursor
        current: Cursor,
        /// Requested position
        requested: LogId,
    },
}

impl StoreError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Malformed capture record.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Payload is not a valid record
    #[error("malformed capture record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Coordinate outside the supported range
    #[error("coordinate {field}={value} out of range")]
    Coordinate {
        /// Field name as published by the connector
        field: &'static str,
        /// Raw value
        value: i64,
    },

    /// Timestamp outside the supported range
    #[error("timestamp {field}={millis} out of range")]
    Timestamp {
        /// Field name as published by the connector
        field: &'static str,
        /// Raw epoch milliseconds
        millis: i64,
    },
}
