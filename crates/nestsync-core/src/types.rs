//! Nested set node model and log positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the log stream the sink consumes by default.
pub const DEFAULT_LOG_STREAM: &str = "nested_set_node_log";

/// Stable identity of a nested set node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Position of an entry in the append-only node log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl LogId {
    /// The position following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log#{}", self.0)
    }
}

impl From<u64> for LogId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A node of the nested set tree.
///
/// `left` and `right` are the nested set boundaries: every descendant of this
/// node has both of its boundaries strictly between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identity, stable for the lifetime of the node
    pub id: NodeId,
    /// Free-form payload
    pub label: String,
    /// Opening boundary (pre-order position)
    pub left: u32,
    /// Closing boundary (post-order position)
    pub right: u32,
    /// Nodes are never deleted, only deactivated
    pub active: bool,
    /// Creation time on the source side
    pub created: DateTime<Utc>,
    /// Last modification time on the source side
    pub updated: DateTime<Utc>,
}

impl Node {
    /// Create an active node whose timestamps are both `at`.
    pub fn new(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        left: u32,
        right: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            left,
            right,
            active: true,
            created: at,
            updated: at,
        }
    }

    /// Whether `other` lies strictly inside this node's boundaries.
    pub fn contains(&self, other: &Node) -> bool {
        self.left < other.left && other.right < self.right
    }
}

/// Snapshot of a node as of a position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log position of this snapshot
    pub log_id: LogId,
    /// State of the node at that position
    pub node: Node,
}

impl LogEntry {
    /// Create a log entry.
    pub fn new(log_id: impl Into<LogId>, node: Node) -> Self {
        Self {
            log_id: log_id.into(),
            node,
        }
    }
}

/// Highest log position fully applied to the materialized node set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub Option<LogId>);

impl Cursor {
    /// A cursor that has never been advanced.
    pub const UNSET: Cursor = Cursor(None);

    /// Cursor positioned at `log_id`.
    pub fn at(log_id: impl Into<LogId>) -> Self {
        Self(Some(log_id.into()))
    }

    /// The applied position, if any.
    pub fn position(&self) -> Option<LogId> {
        self.0
    }

    /// Whether the entry at `log_id` has already been applied.
    pub fn covers(&self, log_id: LogId) -> bool {
        self.0.is_some_and(|applied| log_id <= applied)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(log_id) => write!(f, "{log_id}"),
            None => f.write_str("unset"),
        }
    }
}
