//! Simulator of the source side of the synchronization.
//!
//! The source keeps a nested set in a relational table and inserts a child as
//! the last child of its parent: every boundary at or beyond the parent's
//! right boundary moves by two, and the child takes the freed pair. Each
//! changed row becomes one captured snapshot, in the order the source wrote
//! them, which is what [`SourceTree::take_changes`] hands out.

use chrono::{DateTime, Duration, Utc};
use nestsync_core::{Node, NodeId};
use std::collections::BTreeMap;

use crate::builders::TEST_EPOCH;

/// In-memory source table plus the journal of rows it changed.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    nodes: BTreeMap<NodeId, Node>,
    changes: Vec<Node>,
    next_id: u64,
    ticks: i64,
}

impl SourceTree {
    /// Empty source table
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Insert the root at `(1, 2)`. Returns `None` when the table is not empty.
    pub fn insert_root(&mut self, label: &str) -> Option<NodeId> {
        if !self.nodes.is_empty() {
            return None;
        }
        Some(self.create(label, 1, 2))
    }

    /// Insert a last child under `parent`, shifting boundaries to make room.
    pub fn insert_child(&mut self, label: &str, parent: NodeId) -> Option<NodeId> {
        let slot = self.nodes.get(&parent)?.right;
        let now = self.tick();

        let mut shifted = Vec::new();
        for node in self.nodes.values_mut() {
            let mut moved = false;
            if node.right >= slot {
                node.right += 2;
                moved = true;
            }
            if node.left > slot {
                node.left += 2;
                moved = true;
            }
            if moved {
                node.updated = now;
                shifted.push(node.clone());
            }
        }
        self.changes.extend(shifted);

        Some(self.create(label, slot, slot + 1))
    }

    /// Flip the active flag off
    pub fn deactivate(&mut self, id: NodeId) -> bool {
        self.modify(id, |node| node.active = false)
    }

    /// Change the label
    pub fn rename(&mut self, id: NodeId, label: &str) -> bool {
        self.modify(id, |node| node.label = label.to_string())
    }

    /// Drain the captured snapshots written since the last call.
    pub fn take_changes(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.changes)
    }

    /// Current state of the table
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Current state of one row
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn create(&mut self, label: &str, left: u32, right: u32) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let node = Node::new(id, label, left, right, self.tick());
        self.changes.push(node.clone());
        self.nodes.insert(id, node);
        id
    }

    fn modify(&mut self, id: NodeId, change: impl FnOnce(&mut Node)) -> bool {
        let now = self.tick();
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        change(node);
        node.updated = now;
        self.changes.push(node.clone());
        true
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        TEST_EPOCH + Duration::milliseconds(self.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestsync_core::build;

    fn bounds(source: &SourceTree, id: NodeId) -> (u32, u32) {
        let node = source.get(id).unwrap();
        (node.left, node.right)
    }

    #[test]
    fn second_root_is_refused() {
        let mut source = SourceTree::new();
        assert!(source.insert_root("a").is_some());
        assert!(source.insert_root("b").is_none());
    }

    #[test]
    fn inserts_reproduce_the_food_tree() {
        let mut source = SourceTree::new();
        let food = source.insert_root("Food").unwrap();
        let fruit = source.insert_child("Fruit", food).unwrap();
        let red = source.insert_child("Red", fruit).unwrap();
        let cherry = source.insert_child("Cherry", red).unwrap();
        let yellow = source.insert_child("Yellow", fruit).unwrap();
        let banana = source.insert_child("Banana", yellow).unwrap();
        let meat = source.insert_child("Meat", food).unwrap();
        let beef = source.insert_child("Beef", meat).unwrap();
        let pork = source.insert_child("Pork", meat).unwrap();

        assert_eq!(bounds(&source, food), (1, 18));
        assert_eq!(bounds(&source, fruit), (2, 11));
        assert_eq!(bounds(&source, red), (3, 6));
        assert_eq!(bounds(&source, cherry), (4, 5));
        assert_eq!(bounds(&source, yellow), (7, 10));
        assert_eq!(bounds(&source, banana), (8, 9));
        assert_eq!(bounds(&source, meat), (12, 17));
        assert_eq!(bounds(&source, beef), (13, 14));
        assert_eq!(bounds(&source, pork), (15, 16));
        assert!(build(source.nodes()).is_ok());
    }

    #[test]
    fn insert_journals_shifted_rows_before_the_child() {
        let mut source = SourceTree::new();
        let root = source.insert_root("A").unwrap();
        source.take_changes();

        let child = source.insert_child("B", root).unwrap();
        let changes = source.take_changes();
        let journal: Vec<(NodeId, u32, u32)> =
            changes.iter().map(|n| (n.id, n.left, n.right)).collect();
        assert_eq!(journal, vec![(root, 1, 4), (child, 2, 3)]);
        assert!(source.take_changes().is_empty());
    }

    #[test]
    fn unknown_parent_changes_nothing() {
        let mut source = SourceTree::new();
        source.insert_root("A").unwrap();
        source.take_changes();
        assert!(source.insert_child("B", NodeId(99)).is_none());
        assert!(source.take_changes().is_empty());
    }

    #[test]
    fn modifications_are_journaled() {
        let mut source = SourceTree::new();
        let root = source.insert_root("A").unwrap();
        source.take_changes();

        assert!(source.rename(root, "Z"));
        assert!(source.deactivate(root));
        assert!(!source.rename(NodeId(7), "x"));

        let changes = source.take_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].label, "Z");
        assert!(!changes[1].active);
        assert!(changes[1].updated > changes[0].updated);
    }
}
