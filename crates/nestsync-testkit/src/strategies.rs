//! Proptest strategies for nested sets and captured log streams.

use nestsync_core::{LogEntry, Node};
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use crate::builders::{log_entries, node};
use crate::source::SourceTree;

/// Parent index for each non-root node: entry `i` is the parent of node `i + 1`.
pub fn arb_parents(max_nodes: usize) -> impl Strategy<Value = Vec<usize>> {
    (0..max_nodes.max(1)).prop_flat_map(|extra| {
        (1..=extra)
            .map(|index| (0..index).boxed())
            .collect::<Vec<_>>()
    })
}

/// Nested set encoding of the tree described by `parents`, numbered
/// depth-first. Node ids are `1..=N` with the root at id 1.
pub fn encode(parents: &[usize]) -> Vec<Node> {
    let count = parents.len() + 1;
    let mut children = vec![Vec::new(); count];
    for (index, parent) in parents.iter().enumerate() {
        children[*parent].push(index + 1);
    }

    let mut bounds = vec![(0u32, 0u32); count];
    let mut counter = 0u32;
    let mut stack = vec![(0usize, false)];
    while let Some((index, closing)) = stack.pop() {
        counter += 1;
        if closing {
            bounds[index].1 = counter;
        } else {
            bounds[index].0 = counter;
            stack.push((index, true));
            stack.extend(children[index].iter().rev().map(|child| (*child, false)));
        }
    }

    bounds
        .into_iter()
        .enumerate()
        .map(|(index, (left, right))| {
            let id = index as u64 + 1;
            node(id, &format!("n{id}"), left, right)
        })
        .collect()
}

/// A valid nested set of 1 to `max_nodes` nodes, in shuffled order.
pub fn arb_nested_set(max_nodes: usize) -> impl Strategy<Value = Vec<Node>> {
    arb_parents(max_nodes).prop_flat_map(|parents| Just(encode(&parents)).prop_shuffle())
}

/// A source tree grown by `1..=max_inserts` child inserts below a root.
///
/// Each step picks an existing node as the parent, so the journal of the
/// returned simulator holds the realistic snapshot stream of the whole build.
pub fn arb_source_tree(max_inserts: usize) -> impl Strategy<Value = SourceTree> {
    prop::collection::vec(any::<prop::sample::Index>(), 1..=max_inserts.max(1)).prop_map(
        |picks| {
            let mut source = SourceTree::new();
            let mut known = vec![source.insert_root("root").expect("empty source")];
            for (step, pick) in picks.iter().enumerate() {
                let parent = *pick.get(known.as_slice());
                let child = source
                    .insert_child(&format!("c{step}"), parent)
                    .expect("parent exists");
                known.push(child);
            }
            source
        },
    )
}

/// Captured log stream of an [`arb_source_tree`], with log ids from 1.
pub fn arb_source_log(max_inserts: usize) -> impl Strategy<Value = (Vec<LogEntry>, Vec<Node>)> {
    arb_source_tree(max_inserts).prop_map(|mut source| {
        let log = log_entries(1, source.take_changes());
        (log, source.nodes())
    })
}
