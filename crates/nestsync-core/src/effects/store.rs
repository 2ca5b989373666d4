//! Storage contract for the node log, the materialized node set and cursors.

use crate::errors::StoreError;
use crate::types::{Cursor, LogEntry, LogId, Node, NodeId};
use async_trait::async_trait;

/// Writes produced by one successful merge.
///
/// A batch is committed as a unit: either every insert, every update and the
/// cursor advance become visible, or none of them do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    /// Nodes that are not persisted yet
    pub inserts: Vec<Node>,
    /// New state of nodes that are already persisted
    pub updates: Vec<Node>,
    /// Cursor advance, as `(stream, position)`
    pub cursor: Option<(String, LogId)>,
}

impl StoreBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add nodes to insert
    pub fn insert_all(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.inserts.extend(nodes);
        self
    }

    /// Add nodes to overwrite
    pub fn update_all(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.updates.extend(nodes);
        self
    }

    /// Advance the cursor of `stream` to `position`
    pub fn advance_cursor(mut self, stream: impl Into<String>, position: LogId) -> Self {
        self.cursor = Some((stream.into(), position));
        self
    }

    /// Whether the batch carries no writes at all
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.cursor.is_none()
    }
}

/// Persistence used by the sink side of the synchronization.
///
/// Implementations are expected to be shared between the log writer and the
/// merge worker, hence `&self` everywhere.
#[async_trait]
pub trait NestedSetStore: Send + Sync {
    /// Append node snapshots to the log, assigning increasing log ids.
    async fn append_log_entries(&self, nodes: Vec<Node>) -> Result<Vec<LogEntry>, StoreError>;

    /// Log entries with `log_id >= from`, ordered by log id.
    ///
    /// The bound is inclusive: the entry at the persisted cursor is delivered
    /// again and callers must tolerate it.
    async fn load_pending_log_entries(&self, from: Cursor) -> Result<Vec<LogEntry>, StoreError>;

    /// The whole materialized node set.
    async fn load_current_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// A single materialized node.
    async fn load_node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Persisted cursor of `stream`.
    async fn load_cursor(&self, stream: &str) -> Result<Cursor, StoreError>;

    /// Apply a batch atomically.
    async fn commit(&self, batch: StoreBatch) -> Result<(), StoreError>;
}
