//! Materialized tree produced by the builder.

use crate::types::{Node, NodeId};
use serde::Serialize;
use std::fmt;

/// A node of the materialized tree together with its ordered children.
///
/// Children are owned exclusively and kept in pre-order (ascending `left`).
/// Instances only come out of [`build`](super::build), so every `TreeNode` is
/// a valid nested set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    node: Node,
    children: Vec<TreeNode>,
}

impl TreeNode {
    pub(crate) fn new(node: Node, children: Vec<TreeNode>) -> Self {
        Self { node, children }
    }

    /// The node stored at this position
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Direct children, ordered by `left`
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order walk over the subtree
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Flatten the subtree back into its nodes, in pre-order.
    pub fn flatten(&self) -> Vec<Node> {
        self.iter().map(|tree| tree.node.clone()).collect()
    }

    /// Find the subtree rooted at `id`.
    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.iter().find(|tree| tree.node.id == id)
    }

    /// Distance from this node to `id`, `0` for the node itself.
    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        let target = self.find(id)?.node();
        let mut depth = 0;
        let mut current = self;
        loop {
            if current.node.id == id {
                return Some(depth);
            }
            current = current
                .children
                .iter()
                .find(|child| child.node.left <= target.left && target.right <= child.node.right)?;
            depth += 1;
        }
    }
}

/// Outline with one node per line, for logs:
///
/// ```text
/// |1| Food |6|
///     ├── |2| Fruit |3|
///     └── |4| Meat |5|
/// ```
impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "|{}| {} |{}|", self.node.left, self.node.label, self.node.right)?;
        self.fmt_children(f, "    ")
    }
}

impl TreeNode {
    fn fmt_children(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        for (index, child) in self.children.iter().enumerate() {
            let last = index + 1 == self.children.len();
            let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            writeln!(
                f,
                "{prefix}{branch}|{}| {} |{}|",
                child.node.left, child.node.label, child.node.right
            )?;
            child.fmt_children(f, &format!("{prefix}{indent}"))?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TreeNode {
    type Item = &'a TreeNode;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`TreeNode`].
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.stack.pop()?;
        self.stack.extend(tree.children.iter().rev());
        Some(tree)
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::build;
    use crate::types::{Node, NodeId};
    use chrono::{DateTime, Utc};

    fn food_tree() -> super::TreeNode {
        let at = DateTime::<Utc>::UNIX_EPOCH;
        build(vec![
            Node::new(1, "Food", 1, 10, at),
            Node::new(2, "Fruit", 2, 7, at),
            Node::new(3, "Red", 3, 4, at),
            Node::new(4, "Yellow", 5, 6, at),
            Node::new(5, "Meat", 8, 9, at),
        ])
        .unwrap()
    }

    #[test]
    fn walks_in_pre_order() {
        let tree = food_tree();
        let labels: Vec<&str> = tree.iter().map(|t| t.node().label.as_str()).collect();
        assert_eq!(labels, vec!["Food", "Fruit", "Red", "Yellow", "Meat"]);
        assert_eq!(tree.size(), 5);
        assert!(!tree.is_leaf());
        assert!(tree.find(NodeId(3)).unwrap().is_leaf());
    }

    #[test]
    fn depth_follows_containment() {
        let tree = food_tree();
        assert_eq!(tree.depth_of(NodeId(1)), Some(0));
        assert_eq!(tree.depth_of(NodeId(4)), Some(2));
        assert_eq!(tree.depth_of(NodeId(5)), Some(1));
        assert_eq!(tree.depth_of(NodeId(42)), None);
    }

    #[test]
    fn renders_outline() {
        let expected = "\
|1| Food |10|
    ├── |2| Fruit |7|
    │   ├── |3| Red |4|
    │   └── |5| Yellow |6|
    └── |8| Meat |9|
";
        assert_eq!(food_tree().to_string(), expected);
    }
}
