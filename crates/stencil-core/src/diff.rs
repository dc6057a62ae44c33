//! Identity-preserving sibling list diff.
//!
//! Nodes that keep their relative order (the longest increasing run of old
//! positions in the new list) stay where they are. Everything else is either
//! removed or inserted before its new successor, which moves it if it is
//! already attached.

use crate::collections::map::{HashMap, HashSet};
use crate::dom::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Node(NodeId),
    /// Whatever follows the diffed range.
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    Remove(NodeId),
    InsertBefore { node: NodeId, anchor: Anchor },
}

/// Edits turning `old` into `new`. Both lists must be free of duplicates.
/// Edits are meant to be applied in order.
pub fn plan(old: &[NodeId], new: &[NodeId]) -> Vec<Edit> {
    let old_positions: HashMap<NodeId, usize> = old
        .iter()
        .enumerate()
        .map(|(index, &node)| (node, index))
        .collect();

    let kept = stable_nodes(new, &old_positions);
    let wanted: HashSet<NodeId> = new.iter().copied().collect();

    let mut edits = Vec::new();
    for &node in old {
        if !wanted.contains(&node) {
            edits.push(Edit::Remove(node));
        }
    }
    let mut anchor = Anchor::End;
    for &node in new.iter().rev() {
        if !kept.contains(&node) {
            edits.push(Edit::InsertBefore { node, anchor });
        }
        anchor = Anchor::Node(node);
    }
    edits
}

/// Nodes of `new` forming the longest run whose old positions increase.
fn stable_nodes(new: &[NodeId], old_positions: &HashMap<NodeId, usize>) -> HashSet<NodeId> {
    let candidates: Vec<(NodeId, usize)> = new
        .iter()
        .filter_map(|node| old_positions.get(node).map(|&position| (*node, position)))
        .collect();

    // tails[k]: index into candidates of the smallest tail of a run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; candidates.len()];
    for (index, &(_, position)) in candidates.iter().enumerate() {
        let slot = tails.partition_point(|&tail| candidates[tail].1 < position);
        if slot > 0 {
            previous[index] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut kept = HashSet::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        kept.insert(candidates[index].0);
        cursor = previous[index];
    }
    kept
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
