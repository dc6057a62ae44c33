//! In-memory document tree the templates render into.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. A node id is its identity: moving a node keeps its id, and a
//! removed node stays valid (detached) until the document is dropped.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::NodeError;
use crate::value::Value;

pub type NodeId = usize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// Event callback. Two listeners are the same listener only if they share
/// the same allocation.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Clone, Debug)]
pub struct Element {
    name: String,
    namespace: Namespace,
    attributes: Vec<Attribute>,
    properties: IndexMap<String, Value>,
    listeners: Vec<(String, Listener)>,
}

impl Element {
    fn new(name: &str, namespace: Namespace) -> Self {
        Self {
            name: name.to_string(),
            namespace,
            attributes: Vec::new(),
            properties: IndexMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Whether the element carries a property called `name`, either one of
    /// the built-in properties of its tag or one assigned earlier.
    pub fn exposes_property(&self, name: &str) -> bool {
        if self.properties.contains_key(name) {
            return true;
        }
        if self.namespace != Namespace::Html {
            return false;
        }
        if GLOBAL_PROPERTIES.contains(&name) {
            return true;
        }
        let tag = self.name.as_str();
        match tag {
            "input" | "textarea" | "select" | "option" | "button" => {
                FORM_PROPERTIES.contains(&name)
            }
            "a" | "area" | "link" | "base" => name == "href",
            "img" | "script" | "iframe" | "source" | "video" | "audio" => {
                name == "src" || (tag == "img" && name == "alt")
            }
            _ => false,
        }
    }
}

const GLOBAL_PROPERTIES: &[&str] = &[
    "id",
    "className",
    "hidden",
    "title",
    "lang",
    "dir",
    "tabIndex",
    "draggable",
];

const FORM_PROPERTIES: &[&str] = &[
    "value",
    "defaultValue",
    "checked",
    "indeterminate",
    "disabled",
    "selected",
    "placeholder",
    "name",
    "type",
    "readOnly",
    "required",
    "multiple",
];

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Grouping container; inserting it moves its children instead.
    Fragment,
    Element(Element),
    Text(String),
    Comment(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Counters for mutations applied to non-fragment parents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub insertions: usize,
    pub removals: usize,
    pub text_writes: usize,
    pub attribute_writes: usize,
    pub attribute_removals: usize,
}

impl MutationStats {
    pub fn since(&self, earlier: &MutationStats) -> MutationStats {
        MutationStats {
            insertions: self.insertions.saturating_sub(earlier.insertions),
            removals: self.removals.saturating_sub(earlier.removals),
            text_writes: self.text_writes.saturating_sub(earlier.text_writes),
            attribute_writes: self
                .attribute_writes
                .saturating_sub(earlier.attribute_writes),
            attribute_removals: self
                .attribute_removals
                .saturating_sub(earlier.attribute_removals),
        }
    }

    pub fn tree_operations(&self) -> usize {
        self.insertions + self.removals
    }

    pub fn is_empty(&self) -> bool {
        *self == MutationStats::default()
    }
}

/// Node arena. Ids are never reused: a detached node stays addressable until
/// the document is dropped, so the arena only grows. Hosts that churn through
/// markup for a long time should start a fresh document (and stencil) between
/// independent sessions.
#[derive(Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    stats: MutationStats,
    scratch: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str, namespace: Namespace) -> NodeId {
        self.push(NodeKind::Element(Element::new(name, namespace)))
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(data.into()))
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(data.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeKind::Fragment)
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: NodeId) -> Result<&NodeData, NodeError> {
        self.nodes.get(id).ok_or(NodeError::Missing { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, NodeError> {
        match &mut self
            .nodes
            .get_mut(id)
            .ok_or(NodeError::Missing { id })?
            .kind
        {
            NodeKind::Element(element) => Ok(element),
            _ => Err(NodeError::TypeMismatch {
                id,
                expected: "element",
            }),
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Comment(_)))
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Fragment))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == id)?;
        siblings.get(index + 1).copied()
    }

    /// Character data of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(data)) | Some(NodeKind::Comment(data)) => Some(data),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, data: impl Into<String>) -> Result<(), NodeError> {
        match &mut self.nodes.get_mut(id).ok_or(NodeError::Missing { id })?.kind {
            NodeKind::Text(current) | NodeKind::Comment(current) => {
                *current = data.into();
            }
            _ => {
                return Err(NodeError::TypeMismatch {
                    id,
                    expected: "character data",
                })
            }
        }
        self.stats.text_writes += 1;
        Ok(())
    }

    fn counts_toward_stats(&self, parent: NodeId) -> bool {
        !self.is_fragment(parent)
    }

    fn unlink(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child].parent.take() {
            self.nodes[parent].children.retain(|&c| c != child);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` before `reference` (or at the end). An attached child is
    /// moved; a fragment child hands over all of its children and stays empty.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), NodeError> {
        self.data(parent)?;
        self.data(child)?;
        if reference == Some(child) {
            return Ok(());
        }
        if let Some(reference) = reference {
            if self.data(reference)?.parent != Some(parent) {
                return Err(NodeError::NotAttached { id: reference });
            }
        }
        let moved = if self.is_fragment(child) {
            let moved = std::mem::take(&mut self.nodes[child].children);
            for &node in &moved {
                self.nodes[node].parent = None;
            }
            moved
        } else {
            self.unlink(child);
            vec![child]
        };
        if moved.is_empty() {
            return Ok(());
        }
        let position = match reference {
            Some(reference) => self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == reference)
                .ok_or(NodeError::NotAttached { id: reference })?,
            None => self.nodes[parent].children.len(),
        };
        for &node in &moved {
            self.nodes[node].parent = Some(parent);
        }
        self.nodes[parent]
            .children
            .splice(position..position, moved);
        if self.counts_toward_stats(parent) {
            self.stats.insertions += 1;
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        if self.data(child)?.parent != Some(parent) {
            return Err(NodeError::NotAttached { id: child });
        }
        self.unlink(child);
        if self.counts_toward_stats(parent) {
            self.stats.removals += 1;
        }
        Ok(())
    }

    pub fn detach(&mut self, id: NodeId) -> Result<(), NodeError> {
        match self.data(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attribute(name))
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id)
            .map(|element| element.attributes())
            .unwrap_or(&[])
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), NodeError> {
        let value = value.into();
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => element.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
        self.stats.attribute_writes += 1;
        Ok(())
    }

    /// Returns whether an attribute was actually removed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, NodeError> {
        let element = self.element_mut(id)?;
        let before = element.attributes.len();
        element.attributes.retain(|attr| attr.name != name);
        let removed = element.attributes.len() != before;
        if removed {
            self.stats.attribute_removals += 1;
        }
        Ok(removed)
    }

    pub fn has_property(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.exposes_property(name))
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.element(id)
            .and_then(|element| element.properties.get(name))
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) -> Result<(), NodeError> {
        self.element_mut(id)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    pub fn add_listener(
        &mut self,
        id: NodeId,
        event: &str,
        listener: Listener,
    ) -> Result<(), NodeError> {
        self.element_mut(id)?
            .listeners
            .push((event.to_string(), listener));
        Ok(())
    }

    pub fn remove_listener(
        &mut self,
        id: NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<bool, NodeError> {
        let element = self.element_mut(id)?;
        let position = element
            .listeners
            .iter()
            .position(|(name, existing)| name == event && existing.ptr_eq(listener));
        if let Some(position) = position {
            element.listeners.remove(position);
        }
        Ok(position.is_some())
    }

    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.element(id)
            .map(|element| {
                element
                    .listeners
                    .iter()
                    .filter(|(name, _)| name == event)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Invokes every listener registered on `target` for `name`. Events do not
    /// bubble. Returns the number of listeners called.
    pub fn dispatch_event(&self, target: NodeId, name: &str) -> usize {
        let listeners: Vec<Listener> = match self.element(target) {
            Some(element) => element
                .listeners
                .iter()
                .filter(|(event, _)| event == name)
                .map(|(_, listener)| listener.clone())
                .collect(),
            None => return 0,
        };
        let event = Event {
            name: name.to_string(),
            target,
        };
        for listener in &listeners {
            listener.call(&event);
        }
        listeners.len()
    }

    /// Copies the subtree rooted at `id`. Listeners and properties are not
    /// copied.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId, NodeError> {
        let kind = shallow_copy(&self.data(id)?.kind);
        let children = self.data(id)?.children.clone();
        let copy = self.push(kind);
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        Ok(copy)
    }

    /// Copies the subtree rooted at `id` in `source` into this document.
    pub fn import(&mut self, source: &Document, id: NodeId) -> Result<NodeId, NodeError> {
        let data = source.data(id)?;
        let copy = self.push(shallow_copy(&data.kind));
        for &child in &data.children {
            let child_copy = self.import(source, child)?;
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        Ok(copy)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(data)) => output.push_str(data),
            Some(NodeKind::Comment(_)) | None => {}
            Some(_) => {
                for &child in self.children(id) {
                    self.collect_text(child, output);
                }
            }
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        let raw = self
            .element(id)
            .is_some_and(|element| is_raw_text(element.name()));
        for &child in self.children(id) {
            self.serialize(child, raw, &mut output);
        }
        output
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.serialize(id, false, &mut output);
        output
    }

    fn serialize(&self, id: NodeId, raw_parent: bool, output: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Fragment) => {
                for &child in self.children(id) {
                    self.serialize(child, false, output);
                }
            }
            Some(NodeKind::Element(element)) => {
                output.push('<');
                output.push_str(element.name());
                for attr in element.attributes() {
                    output.push(' ');
                    output.push_str(&attr.name);
                    output.push_str("=\"");
                    escape_into(&attr.value, true, output);
                    output.push('"');
                }
                output.push('>');
                if element.namespace() == Namespace::Html && is_void(element.name()) {
                    return;
                }
                let raw = is_raw_text(element.name());
                for &child in self.children(id) {
                    self.serialize(child, raw, output);
                }
                output.push_str("</");
                output.push_str(element.name());
                output.push('>');
            }
            Some(NodeKind::Text(data)) => {
                if raw_parent {
                    output.push_str(data);
                } else {
                    escape_into(data, false, output);
                }
            }
            Some(NodeKind::Comment(data)) => {
                output.push_str("<!--");
                output.push_str(data);
                output.push_str("-->");
            }
            None => {}
        }
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    /// Reusable grouping container for batched inserts.
    pub(crate) fn scratch_fragment(&mut self) -> NodeId {
        match self.scratch {
            Some(id) => id,
            None => {
                let id = self.create_fragment();
                self.scratch = Some(id);
                id
            }
        }
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let label = match self.kind(id) {
            Some(NodeKind::Fragment) => "#fragment".to_string(),
            Some(NodeKind::Element(element)) => format!("<{}>", element.name()),
            Some(NodeKind::Text(data)) => format!("{data:?}"),
            Some(NodeKind::Comment(data)) => format!("<!--{data}-->"),
            None => "(missing)".to_string(),
        };
        output.push_str(&format!("{indent}[{id}] {label}\n"));
        for &child in self.children(id) {
            self.dump_node(output, child, depth + 1);
        }
    }
}

fn shallow_copy(kind: &NodeKind) -> NodeKind {
    match kind {
        NodeKind::Element(element) => NodeKind::Element(Element {
            name: element.name.clone(),
            namespace: element.namespace,
            attributes: element.attributes.clone(),
            properties: IndexMap::new(),
            listeners: Vec::new(),
        }),
        other => other.clone(),
    }
}

pub(crate) fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is a single literal text run.
pub(crate) fn is_raw_text(name: &str) -> bool {
    matches!(
        name,
        "script"
            | "style"
            | "textarea"
            | "title"
            | "xmp"
            | "iframe"
            | "noscript"
            | "noembed"
            | "noframes"
            | "plaintext"
    )
}

fn escape_into(data: &str, attribute: bool, output: &mut String) {
    for c in data.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' if !attribute => output.push_str("&lt;"),
            '>' if !attribute => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            other => output.push(other),
        }
    }
}

#[cfg(test)]
#[path = "tests/dom_tests.rs"]
mod tests;
