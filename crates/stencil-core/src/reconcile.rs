use log::{debug, trace, warn};

use crate::collections::map::HashSet;
use crate::diff::{self, Anchor, Edit};
use crate::dom::{Document, NodeId};
use crate::error::NodeError;

/// Interior size above which the general diff is skipped for replace-all.
pub const DEFAULT_DIFF_LIMIT: usize = 1000;

/// The live content of one node hole: the nodes currently inserted for it,
/// followed in document order by its marker.
#[derive(Debug)]
pub struct ManagedGroup {
    marker: NodeId,
    nodes: Vec<NodeId>,
}

impl ManagedGroup {
    pub fn new(marker: NodeId) -> Self {
        Self {
            marker,
            nodes: Vec::new(),
        }
    }

    pub fn marker(&self) -> NodeId {
        self.marker
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Makes the live siblings before the marker exactly `desired`, keeping
    /// every node that appears in both lists.
    ///
    /// A group whose marker is detached only updates its bookkeeping; the
    /// nodes are placed when the marker is attached again together with
    /// the group's content.
    pub fn reconcile(
        &mut self,
        document: &mut Document,
        desired: Vec<NodeId>,
        limit: usize,
    ) -> Result<(), NodeError> {
        let desired = dedup(desired);
        let Some(parent) = document.parent(self.marker) else {
            for &node in self.nodes.iter().chain(&desired) {
                document.detach(node)?;
            }
            self.nodes = desired;
            return Ok(());
        };

        // Nested groups sharing this parent may already have moved or
        // removed some of our nodes.
        self.nodes.retain(|&node| document.parent(node) == Some(parent));
        match self.place(document, parent, &desired, limit) {
            Ok(()) => {
                self.nodes = desired;
                Ok(())
            }
            Err(err) => {
                self.resync(document, parent, &desired);
                Err(err)
            }
        }
    }

    fn place(
        &self,
        document: &mut Document,
        parent: NodeId,
        desired: &[NodeId],
        limit: usize,
    ) -> Result<(), NodeError> {
        if desired.is_empty() {
            if !self.nodes.is_empty() {
                trace!("clearing {} managed nodes", self.nodes.len());
            }
            for &node in &self.nodes {
                document.remove_child(parent, node)?;
            }
            return Ok(());
        }
        if self.nodes.is_empty() {
            return insert_all(document, parent, desired, Some(self.marker));
        }

        let old = &self.nodes;
        let mut prefix = 0;
        let shorter = old.len().min(desired.len());
        while prefix < shorter && old[prefix] == desired[prefix] {
            prefix += 1;
        }
        let mut suffix = 0;
        while suffix < shorter - prefix
            && old[old.len() - 1 - suffix] == desired[desired.len() - 1 - suffix]
        {
            suffix += 1;
        }
        let old_interior = &old[prefix..old.len() - suffix];
        let new_interior = &desired[prefix..desired.len() - suffix];
        let end = old.get(old.len() - suffix).copied().unwrap_or(self.marker);

        if old_interior.is_empty() {
            trace!("inserting {} nodes at {prefix}", new_interior.len());
            insert_all(document, parent, new_interior, Some(end))?;
        } else if new_interior.is_empty() {
            trace!("removing {} nodes at {prefix}", old_interior.len());
            for &node in old_interior {
                document.remove_child(parent, node)?;
            }
        } else if old_interior.len() + new_interior.len() <= limit {
            for edit in diff::plan(old_interior, new_interior) {
                match edit {
                    Edit::Remove(node) => document.remove_child(parent, node)?,
                    Edit::InsertBefore { node, anchor } => {
                        let anchor = match anchor {
                            Anchor::Node(anchor) => anchor,
                            Anchor::End => end,
                        };
                        document.insert_before(parent, node, Some(anchor))?;
                    }
                }
            }
        } else {
            debug!(
                "replacing {} nodes with {} above the diff limit of {limit}",
                old_interior.len(),
                new_interior.len()
            );
            for &node in old_interior {
                document.remove_child(parent, node)?;
            }
            insert_all(document, parent, new_interior, Some(end))?;
        }
        Ok(())
    }

    /// Rebuilds the managed list from the live run of siblings that ends at
    /// the marker, after a failed pass left it out of date.
    fn resync(&mut self, document: &Document, parent: NodeId, desired: &[NodeId]) {
        let children = document.children(parent);
        let Some(end) = children.iter().position(|&child| child == self.marker) else {
            self.nodes.clear();
            return;
        };
        let ours: HashSet<NodeId> = self.nodes.iter().chain(desired).copied().collect();
        let mut start = end;
        while start > 0 && ours.contains(&children[start - 1]) {
            start -= 1;
        }
        warn!(
            "managed group resynced to {} live nodes after a failed update",
            end - start
        );
        self.nodes = children[start..end].to_vec();
    }
}

/// Inserts `nodes` in order before `reference`, batching through a grouping
/// container when there is more than one.
fn insert_all(
    document: &mut Document,
    parent: NodeId,
    nodes: &[NodeId],
    reference: Option<NodeId>,
) -> Result<(), NodeError> {
    match nodes {
        [] => Ok(()),
        [node] => document.insert_before(parent, *node, reference),
        _ => {
            let batch = document.scratch_fragment();
            for &node in nodes {
                document.append_child(batch, node)?;
            }
            document.insert_before(parent, batch, reference)
        }
    }
}

fn dedup(nodes: Vec<NodeId>) -> Vec<NodeId> {
    if nodes.len() < 2 {
        return nodes;
    }
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.into_iter().filter(|node| seen.insert(*node)).collect()
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
