//! Validation and reconstruction of a tree from a flat nested set.
//!
//! ## Algorithm
//!
//! 1. Reject empty input
//! 2. Pre-order: sorted by `left`, lefts must be strictly increasing
//! 3. Post-order: sorted by `right` descending, rights must be strictly decreasing
//! 4. All `2N` coordinates together must be distinct
//! 5. The smallest coordinate must be `1` and the largest exactly `2N`
//! 6. Walk the pre-order sequence with a stack of open ancestors; the first
//!    ancestor still open when a node closes is its parent
//!
//! Steps 2-5 establish that the coordinates are a permutation of `[1, 2N]`.
//! Step 6 additionally requires `left < right` for every node and rejects
//! nodes that start inside an already closed sibling, so every accepted set
//! is a proper nested set.

use super::node::TreeNode;
use crate::errors::TreeError;
use crate::types::Node;

/// Build the tree described by a flat collection of nodes.
///
/// Either the whole collection forms one valid nested set tree, or an error
/// describing the first violation found is returned. Pre-order flattening of
/// the returned tree yields exactly the input nodes.
pub fn build<I>(nodes: I) -> Result<TreeNode, TreeError>
where
    I: IntoIterator<Item = Node>,
{
    let mut nodes: Vec<Node> = nodes.into_iter().collect();
    if nodes.is_empty() {
        return Err(TreeError::Empty);
    }

    nodes.sort_by_key(|node| node.left);
    verify_coordinates(&nodes)?;

    let children = link_children(&nodes)?;
    assemble(nodes, children).ok_or(TreeError::Empty)
}

/// Steps 2-5 over nodes already sorted by `left`.
fn verify_coordinates(nodes: &[Node]) -> Result<(), TreeError> {
    if let Some(pair) = nodes.windows(2).find(|pair| pair[0].left >= pair[1].left) {
        return Err(TreeError::DuplicateLeft { left: pair[1].left });
    }

    let mut rights: Vec<u32> = nodes.iter().map(|node| node.right).collect();
    rights.sort_unstable_by(|a, b| b.cmp(a));
    if let Some(pair) = rights.windows(2).find(|pair| pair[0] <= pair[1]) {
        return Err(TreeError::DuplicateRight { right: pair[1] });
    }

    let mut coordinates: Vec<u32> = nodes
        .iter()
        .flat_map(|node| [node.left, node.right])
        .collect();
    coordinates.sort_unstable();
    if let Some(pair) = coordinates.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(TreeError::SharedCoordinate {
            coordinate: pair[1],
        });
    }

    let min = coordinates.first().copied().map_or(0, u64::from);
    let max = coordinates.last().copied().map_or(0, u64::from);
    let expected = 2 * nodes.len() as u64;
    if min != 1 || max != expected {
        return Err(TreeError::CoordinateRange { min, max, expected });
    }

    Ok(())
}

/// Step 6: resolve the parent of every node, as child index lists.
///
/// `nodes` is in pre-order, so a child index is always greater than the index
/// of its parent.
fn link_children(nodes: &[Node]) -> Result<Vec<Vec<usize>>, TreeError> {
    if let Some(node) = nodes.iter().find(|node| node.left >= node.right) {
        return Err(TreeError::InvertedBounds {
            id: node.id,
            left: node.left,
            right: node.right,
        });
    }

    let mut children = vec![Vec::new(); nodes.len()];
    let mut open: Vec<usize> = vec![0];

    for (index, node) in nodes.iter().enumerate().skip(1) {
        while let Some(&top) = open.last() {
            let ancestor = &nodes[top];
            if ancestor.right >= node.right {
                break;
            }
            if ancestor.right > node.left {
                return Err(TreeError::Overlap {
                    id: node.id,
                    sibling: ancestor.id,
                });
            }
            open.pop();
        }

        let parent = *open
            .last()
            .ok_or(TreeError::Unparentable { id: node.id })?;
        children[parent].push(index);
        open.push(index);
    }

    Ok(children)
}

/// Move the nodes into their owning parents, deepest first.
fn assemble(nodes: Vec<Node>, mut children: Vec<Vec<usize>>) -> Option<TreeNode> {
    let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(nodes.len());
    built.resize_with(nodes.len(), || None);

    for (index, node) in nodes.into_iter().enumerate().rev() {
        let subtrees = std::mem::take(&mut children[index])
            .into_iter()
            .filter_map(|child| built[child].take())
            .collect();
        built[index] = Some(TreeNode::new(node, subtrees));
    }

    built.into_iter().next().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Utc};

    fn node(id: u64, left: u32, right: u32) -> Node {
        Node::new(id, format!("n{id}"), left, right, DateTime::<Utc>::UNIX_EPOCH)
    }

    fn ids(tree: &TreeNode) -> Vec<u64> {
        tree.children().iter().map(|c| c.node().id.0).collect()
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(build(Vec::new()), Err(TreeError::Empty));
    }

    #[test]
    fn single_root() {
        let tree = build(vec![node(1, 1, 2)]).unwrap();
        assert_eq!(tree.node().id, NodeId(1));
        assert!(tree.is_leaf());
    }

    #[test]
    fn root_with_two_children_in_order() {
        // Given in scrambled order on purpose
        let tree = build(vec![node(3, 4, 5), node(1, 1, 6), node(2, 2, 3)]).unwrap();
        assert_eq!(tree.node().label, "n1");
        assert_eq!(ids(&tree), vec![2, 3]);
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn deep_chain_and_siblings() {
        //        1(1,10)
        //       /       \
        //   2(2,7)     5(8,9)
        //     |
        //   3(3,6)
        //     |
        //   4(4,5)
        let tree = build(vec![
            node(1, 1, 10),
            node(2, 2, 7),
            node(3, 3, 6),
            node(4, 4, 5),
            node(5, 8, 9),
        ])
        .unwrap();
        assert_eq!(ids(&tree), vec![2, 5]);
        assert_eq!(tree.depth_of(NodeId(4)), Some(3));
        assert_eq!(tree.depth_of(NodeId(5)), Some(1));
        assert_eq!(tree.depth_of(NodeId(42)), None);
        let walk: Vec<u64> = tree.iter().map(|t| t.node().id.0).collect();
        assert_eq!(walk, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn flatten_reproduces_input() {
        let input = vec![node(1, 1, 8), node(2, 2, 5), node(3, 3, 4), node(4, 6, 7)];
        let tree = build(input.clone()).unwrap();
        assert_eq!(tree.flatten(), input);
    }

    #[test]
    fn duplicate_left() {
        let result = build(vec![node(1, 1, 4), node(2, 1, 3)]);
        assert_matches!(result, Err(TreeError::DuplicateLeft { left: 1 }));
    }

    #[test]
    fn duplicate_right() {
        let result = build(vec![node(1, 1, 4), node(2, 2, 4)]);
        assert_matches!(result, Err(TreeError::DuplicateRight { right: 4 }));
    }

    #[test]
    fn coordinate_shared_between_left_and_right() {
        let result = build(vec![node(1, 1, 4), node(2, 4, 5)]);
        assert_matches!(result, Err(TreeError::SharedCoordinate { coordinate: 4 }));
    }

    #[test]
    fn gap_in_coordinates() {
        // Root widened for a child that has not arrived yet
        let result = build(vec![node(1, 1, 4)]);
        assert_matches!(
            result,
            Err(TreeError::CoordinateRange { min: 1, max: 4, expected: 2 })
        );
    }

    #[test]
    fn coordinates_must_start_at_one() {
        // distinct coordinates topping out at 2N, but 0 stands in for 3
        let result = build(vec![node(1, 0, 4), node(2, 1, 2)]);
        assert_matches!(
            result,
            Err(TreeError::CoordinateRange { min: 0, max: 4, expected: 4 })
        );

        let shifted = build(vec![node(1, 2, 5), node(2, 3, 4)]);
        assert_matches!(shifted, Err(TreeError::CoordinateRange { min: 2, .. }));
    }

    #[test]
    fn inverted_bounds() {
        let result = build(vec![node(1, 1, 4), node(2, 3, 2)]);
        assert_matches!(result, Err(TreeError::InvertedBounds { id: NodeId(2), .. }));
    }

    #[test]
    fn crossing_siblings() {
        // (2,4) and (3,5) partially overlap
        let result = build(vec![node(1, 1, 6), node(2, 2, 4), node(3, 3, 5)]);
        assert_matches!(
            result,
            Err(TreeError::Overlap {
                id: NodeId(3),
                sibling: NodeId(2)
            })
        );
    }

    #[test]
    fn second_root() {
        let result = build(vec![node(1, 1, 2), node(2, 3, 4)]);
        assert_matches!(result, Err(TreeError::Unparentable { id: NodeId(2) }));
    }
}
