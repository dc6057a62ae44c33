use super::*;
use crate::dom::{MutationStats, Namespace};

struct Fixture {
    document: Document,
    parent: NodeId,
    group: ManagedGroup,
}

impl Fixture {
    /// A parent holding `before`, the group's marker, then `after`.
    fn new() -> Self {
        let mut document = Document::new();
        let parent = document.create_element("ul", Namespace::Html);
        let before = document.create_text("<");
        let marker = document.create_comment("hole");
        let after = document.create_text(">");
        for node in [before, marker, after] {
            document.append_child(parent, node).unwrap();
        }
        Self {
            document,
            parent,
            group: ManagedGroup::new(marker),
        }
    }

    fn items(&mut self, count: usize) -> Vec<NodeId> {
        (0..count)
            .map(|index| self.document.create_text(index.to_string()))
            .collect()
    }

    fn reconcile(&mut self, desired: Vec<NodeId>, limit: usize) -> MutationStats {
        let before = self.document.stats();
        self.group
            .reconcile(&mut self.document, desired, limit)
            .unwrap();
        self.document.stats().since(&before)
    }

    /// Siblings strictly between the leading text and the marker.
    fn managed(&self) -> Vec<NodeId> {
        let children = self.document.children(self.parent);
        children[1..children.len() - 2].to_vec()
    }
}

#[test]
fn first_fill_is_a_single_insertion() {
    let mut fixture = Fixture::new();
    let items = fixture.items(3);

    let stats = fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    assert_eq!(stats.insertions, 1);
    assert_eq!(fixture.managed(), items);
    assert_eq!(fixture.group.nodes(), items.as_slice());
}

#[test]
fn appending_one_node_is_one_insertion() {
    let mut fixture = Fixture::new();
    let mut items = fixture.items(4);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    items.extend(fixture.items(1));
    let stats = fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    assert_eq!(stats.tree_operations(), 1);
    assert_eq!(stats.insertions, 1);
    assert_eq!(fixture.managed(), items);
}

#[test]
fn prepending_one_node_is_one_insertion() {
    let mut fixture = Fixture::new();
    let items = fixture.items(4);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    let mut desired = fixture.items(1);
    desired.extend(&items);
    let stats = fixture.reconcile(desired.clone(), DEFAULT_DIFF_LIMIT);

    assert_eq!(stats.tree_operations(), 1);
    assert_eq!(fixture.managed(), desired);
}

#[test]
fn truncating_removes_only_the_tail() {
    let mut fixture = Fixture::new();
    let items = fixture.items(5);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    let stats = fixture.reconcile(items[..4].to_vec(), DEFAULT_DIFF_LIMIT);

    assert_eq!(stats.removals, 1);
    assert_eq!(stats.insertions, 0);
    assert_eq!(fixture.document.parent(items[4]), None);
}

#[test]
fn reorder_keeps_node_identity() {
    let mut fixture = Fixture::new();
    let items = fixture.items(4);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    let desired = vec![items[0], items[2], items[1], items[3]];
    let stats = fixture.reconcile(desired.clone(), DEFAULT_DIFF_LIMIT);

    assert_eq!(fixture.managed(), desired);
    assert_eq!(stats.removals, 0);
    assert_eq!(stats.insertions, 1);
}

#[test]
fn clearing_leaves_surrounding_nodes() {
    let mut fixture = Fixture::new();
    let items = fixture.items(3);
    fixture.reconcile(items, DEFAULT_DIFF_LIMIT);

    let stats = fixture.reconcile(Vec::new(), DEFAULT_DIFF_LIMIT);

    assert_eq!(stats.removals, 3);
    assert!(fixture.group.is_empty());
    assert_eq!(fixture.document.text_content(fixture.parent), "<>");
}

#[test]
fn above_the_limit_replaces_the_interior() {
    let mut fixture = Fixture::new();
    let items = fixture.items(6);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);

    let desired = vec![items[0], items[4], items[3], items[2], items[1], items[5]];
    let stats = fixture.reconcile(desired.clone(), 4);

    assert_eq!(fixture.managed(), desired);
    assert_eq!(stats.removals, 4);
    assert_eq!(stats.insertions, 1);
}

#[test]
fn duplicates_keep_the_first_occurrence() {
    let mut fixture = Fixture::new();
    let items = fixture.items(2);

    fixture.reconcile(vec![items[0], items[1], items[0]], DEFAULT_DIFF_LIMIT);

    assert_eq!(fixture.managed(), items);
}

#[test]
fn detached_marker_only_tracks_nodes() {
    let mut document = Document::new();
    let marker = document.create_comment("hole");
    let node = document.create_text("x");
    let mut group = ManagedGroup::new(marker);

    group.reconcile(&mut document, vec![node], DEFAULT_DIFF_LIMIT).unwrap();

    assert_eq!(group.nodes(), &[node]);
    assert_eq!(document.parent(node), None);
    assert!(document.stats().is_empty());
}

#[test]
fn nodes_moved_away_by_another_group_are_forgotten() {
    let mut fixture = Fixture::new();
    let items = fixture.items(3);
    fixture.reconcile(items.clone(), DEFAULT_DIFF_LIMIT);
    fixture.document.detach(items[1]).unwrap();
    let elsewhere = fixture.document.create_element("div", Namespace::Html);
    fixture.document.append_child(elsewhere, items[2]).unwrap();

    let replacement = fixture.items(1);
    let desired = vec![items[0], replacement[0]];
    fixture.reconcile(desired.clone(), DEFAULT_DIFF_LIMIT);

    assert_eq!(fixture.managed(), desired);
    assert_eq!(fixture.document.parent(items[2]), Some(elsewhere));
}

#[test]
fn failed_pass_resyncs_with_live_nodes() {
    let mut fixture = Fixture::new();
    let items = fixture.items(3);
    fixture.reconcile(items[..2].to_vec(), DEFAULT_DIFF_LIMIT);

    let missing = fixture.document.len() + 10;
    let desired = vec![items[0], items[2], missing];
    let result = fixture
        .group
        .reconcile(&mut fixture.document, desired, DEFAULT_DIFF_LIMIT);

    assert_eq!(result, Err(NodeError::Missing { id: missing }));
    assert_eq!(fixture.group.nodes(), fixture.managed().as_slice());

    fixture.reconcile(vec![items[2]], DEFAULT_DIFF_LIMIT);
    assert_eq!(fixture.managed(), vec![items[2]]);
}
