//! Pure merge of pending log entries into the current node set.
//!
//! Only the newest snapshot of each node counts: entries are deduplicated by
//! node id keeping the highest log id, so the result does not depend on the
//! order the entries are handed in. The prospective node set (current nodes
//! overwritten by the deduplicated snapshots) must form a valid nested set
//! tree, otherwise the whole batch is rejected and nothing is written.

use nestsync_core::{build, LogEntry, LogId, Node, NodeId, TreeError};
use std::collections::{BTreeMap, HashMap};

/// Writes to apply for an accepted merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Highest log id of the merged entries
    pub new_cursor: LogId,
    /// Snapshots of nodes that are not persisted yet, in log order
    pub inserted: Vec<Node>,
    /// Snapshots of persisted nodes, in log order
    pub updated: Vec<Node>,
}

impl MergeResult {
    /// Number of written nodes
    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }

    /// Whether the merge writes no node at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of merging pending log entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing was pending
    NoOp,
    /// The prospective node set is a valid tree
    Applied(MergeResult),
    /// The prospective node set is not a valid tree (yet)
    Rejected(TreeError),
}

impl MergeOutcome {
    /// Whether the merge produced writes
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Merge `pending` log entries into the `current` node set.
pub fn merge(pending: &[LogEntry], current: &[Node]) -> MergeOutcome {
    let latest = latest_per_node(pending);
    let Some(new_cursor) = latest.last().map(|entry| entry.log_id) else {
        return MergeOutcome::NoOp;
    };

    let mut prospective: BTreeMap<NodeId, Node> = current
        .iter()
        .map(|node| (node.id, node.clone()))
        .collect();

    let mut inserted = Vec::new();
    let mut updated = Vec::new();
    for entry in latest {
        let node = entry.node.clone();
        if prospective.insert(node.id, node.clone()).is_some() {
            updated.push(node);
        } else {
            inserted.push(node);
        }
    }

    match build(prospective.into_values()) {
        Ok(_) => MergeOutcome::Applied(MergeResult {
            new_cursor,
            inserted,
            updated,
        }),
        Err(reason) => MergeOutcome::Rejected(reason),
    }
}

/// One entry per node id, the one with the highest log id, sorted by log id.
fn latest_per_node(pending: &[LogEntry]) -> Vec<&LogEntry> {
    let mut latest: HashMap<NodeId, &LogEntry> = HashMap::with_capacity(pending.len());
    for entry in pending {
        latest
            .entry(entry.node.id)
            .and_modify(|kept| {
                if entry.log_id > kept.log_id {
                    *kept = entry;
                }
            })
            .or_insert(entry);
    }

    let mut entries: Vec<&LogEntry> = latest.into_values().collect();
    entries.sort_by_key(|entry| entry.log_id);
    entries
}
