//! In-memory [`NestedSetStore`] with whole-batch atomic commits.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::RwLock` for the state because:
//! 1. Every operation is a short in-memory copy or scan
//! 2. Lock is never held across `.await` points
//! 3. `commit` validates and applies under one write guard, which is what
//!    makes a batch atomic

use async_trait::async_trait;
use nestsync_core::effects::{NestedSetStore, StoreBatch};
use nestsync_core::{Cursor, LogEntry, LogId, Node, NodeId, StoreError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Everything the store holds, in a serializable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Append-only node log, ordered by log id
    pub log: Vec<LogEntry>,
    /// Materialized node set
    pub nodes: BTreeMap<NodeId, Node>,
    /// Applied position per log stream
    pub cursors: BTreeMap<String, LogId>,
}

/// Process-local store for the node log, the materialized nodes and cursors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a previously taken snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().clone()
    }

    /// Write the current state to `path` as JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&*self.state.read())
            .map_err(|e| StoreError::backend(format!("encode snapshot: {e}")))?;
        std::fs::write(path, bytes)
            .map_err(|e| StoreError::backend(format!("write {}: {e}", path.display())))
    }

    /// Read a store previously written with [`save_to_file`](Self::save_to_file).
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StoreError::backend(format!("read {}: {e}", path.display())))?;
        let snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::backend(format!("decode snapshot: {e}")))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Number of entries ever appended to the log
    pub fn log_len(&self) -> usize {
        self.state.read().log.len()
    }
}

/// Reject the batch unless every write in it can be applied.
fn check_batch(state: &StoreSnapshot, batch: &StoreBatch) -> Result<(), StoreError> {
    let mut inserted = BTreeSet::new();
    for node in &batch.inserts {
        if state.nodes.contains_key(&node.id) || !inserted.insert(node.id) {
            return Err(StoreError::DuplicateNode { id: node.id });
        }
    }

    if let Some(node) = batch
        .updates
        .iter()
        .find(|node| !state.nodes.contains_key(&node.id))
    {
        return Err(StoreError::NodeNotFound { id: node.id });
    }

    if let Some((stream, position)) = &batch.cursor {
        let current = Cursor(state.cursors.get(stream).copied());
        if current.position().is_some_and(|applied| *position < applied) {
            return Err(StoreError::CursorRegression {
                stream: stream.clone(),
                current,
                requested: *position,
            });
        }
    }

    Ok(())
}

#[async_trait]
impl NestedSetStore for MemoryStore {
    async fn append_log_entries(&self, nodes: Vec<Node>) -> Result<Vec<LogEntry>, StoreError> {
        let mut state = self.state.write();
        let mut next = state
            .log
            .last()
            .map_or(LogId(1), |entry| entry.log_id.next());

        let entries: Vec<LogEntry> = nodes
            .into_iter()
            .map(|node| {
                let entry = LogEntry::new(next, node);
                next = next.next();
                entry
            })
            .collect();
        state.log.extend(entries.iter().cloned());
        Ok(entries)
    }

    async fn load_pending_log_entries(&self, from: Cursor) -> Result<Vec<LogEntry>, StoreError> {
        let state = self.state.read();
        let start = from.position().unwrap_or(LogId(0));
        // log ids are assigned in increasing order
        let first = state.log.partition_point(|entry| entry.log_id < start);
        Ok(state.log[first..].to_vec())
    }

    async fn load_current_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.state.read().nodes.values().cloned().collect())
    }

    async fn load_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.state.read().nodes.get(&id).cloned())
    }

    async fn load_cursor(&self, stream: &str) -> Result<Cursor, StoreError> {
        Ok(Cursor(self.state.read().cursors.get(stream).copied()))
    }

    async fn commit(&self, batch: StoreBatch) -> Result<(), StoreError> {
        let mut state = self.state.write();
        check_batch(&state, &batch)?;

        let (inserted, updated) = (batch.inserts.len(), batch.updates.len());
        for node in batch.inserts.into_iter().chain(batch.updates) {
            state.nodes.insert(node.id, node);
        }
        if let Some((stream, position)) = batch.cursor {
            tracing::debug!(stream = %stream, cursor = %position, "Advancing log cursor");
            state.cursors.insert(stream, position);
        }

        tracing::debug!(inserted, updated, "Committed store batch");
        Ok(())
    }
}
