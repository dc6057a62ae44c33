//! Node-position holes.
//!
//! A [`NodeSlot`] classifies each value once and routes it to the text path,
//! the reconciler, a nested template, a deferred wait or a transformer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::warn;

use crate::collections::map::HashMap;
use crate::deferred::Deferred;
use crate::dom::{Document, Namespace, NodeId};
use crate::error::RenderError;
use crate::reconcile::ManagedGroup;
use crate::render::{RenderContext, Wire};
use crate::runtime::Command;
use crate::updater::Updater;
use crate::value::{Key, Placeholder, Value};

/// How a list value is rendered, decided by its first item.
enum ListShape {
    Empty,
    Primitives,
    Nested,
    Deferred,
    Templates,
    Nodes,
}

impl ListShape {
    fn of(items: &[Value]) -> Self {
        match items.first() {
            None => ListShape::Empty,
            Some(first) if first.is_primitive() => ListShape::Primitives,
            Some(Value::List(_)) => ListShape::Nested,
            Some(Value::Deferred(_)) => ListShape::Deferred,
            Some(Value::Template(_)) => ListShape::Templates,
            Some(_) => ListShape::Nodes,
        }
    }
}

/// Identity of a nested template rendered into a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum WireKey {
    Explicit(Key),
    Index(usize),
    Namespace(Namespace),
}

struct SlotState {
    group: ManagedGroup,
    last: Option<Value>,
    /// Bumped on every newly assigned value; pending deferred values from an
    /// older generation are dropped on resolution.
    generation: u64,
    wires: HashMap<WireKey, Wire>,
}

#[derive(Clone)]
pub struct NodeSlot(Rc<RefCell<SlotState>>);

impl NodeSlot {
    pub fn new(marker: NodeId) -> Self {
        Self(Rc::new(RefCell::new(SlotState {
            group: ManagedGroup::new(marker),
            last: None,
            generation: 0,
            wires: HashMap::new(),
        })))
    }

    pub fn marker(&self) -> NodeId {
        self.0.borrow().group.marker()
    }

    pub fn managed_nodes(&self) -> Vec<NodeId> {
        self.0.borrow().group.nodes().to_vec()
    }

    fn generation(&self) -> u64 {
        self.0.borrow().generation
    }

    fn await_value(&self, cx: &mut RenderContext<'_>, deferred: Deferred, generation: u64) {
        let slot: Weak<RefCell<SlotState>> = Rc::downgrade(&self.0);
        cx.runtime().await_deferred(
            deferred,
            Box::new(move |value| {
                let command: Command = Box::new(move |cx: &mut RenderContext<'_>| {
                    let Some(state) = slot.upgrade() else {
                        return Ok(());
                    };
                    let mut slot = NodeSlot(state);
                    if slot.generation() != generation {
                        warn!("discarding a resolved value for a hole that was assigned since");
                        return Ok(());
                    }
                    slot.apply(cx, value).map(|_| ())
                });
                command
            }),
        );
    }

    fn dispatch(
        &self,
        state: &mut SlotState,
        cx: &mut RenderContext<'_>,
        mut value: Value,
        generation: u64,
    ) -> Result<(), RenderError> {
        loop {
            value = match value {
                Value::Null => return set_text(state, cx, String::new()),
                Value::Bool(_) | Value::Number(_) | Value::Str(_) => {
                    let text = value.as_text().unwrap_or_default();
                    return set_text(state, cx, text);
                }
                Value::Node(node) => {
                    let nodes = unwrap_fragment(cx.document(), node);
                    return set_nodes(state, cx, nodes);
                }
                Value::Template(invocation) => {
                    let key = invocation
                        .key()
                        .map(WireKey::Explicit)
                        .unwrap_or(WireKey::Namespace(invocation.namespace()));
                    let nodes = state
                        .wires
                        .entry(key)
                        .or_default()
                        .render_nodes(cx, invocation)?;
                    return set_nodes(state, cx, nodes);
                }
                Value::List(items) => match ListShape::of(&items) {
                    ListShape::Empty => {
                        state.wires.clear();
                        return set_nodes(state, cx, Vec::new());
                    }
                    ListShape::Primitives => {
                        let text = items
                            .iter()
                            .map(|item| item.as_text().unwrap_or_default())
                            .collect();
                        return set_text(state, cx, text);
                    }
                    ListShape::Nested => Value::List(flatten(items)),
                    ListShape::Deferred => Value::Deferred(Deferred::all(items)),
                    ListShape::Templates => return render_templates(state, cx, items),
                    ListShape::Nodes => {
                        let mut nodes = Vec::with_capacity(items.len());
                        for item in items {
                            match item {
                                Value::Node(node) => {
                                    nodes.extend(unwrap_fragment(cx.document(), node))
                                }
                                other => {
                                    return Err(RenderError::unsupported(
                                        other.kind_name(),
                                        "node list",
                                    ))
                                }
                            }
                        }
                        return set_nodes(state, cx, nodes);
                    }
                },
                Value::Deferred(deferred) => {
                    self.await_value(cx, deferred, generation);
                    return Ok(());
                }
                Value::Text(inner) => {
                    let text = match *inner {
                        Value::List(items) => items.iter().map(Value::as_text).collect(),
                        other => other.as_text(),
                    }
                    .ok_or_else(|| RenderError::unsupported("non-primitive", "text wrapper"))?;
                    return set_text(state, cx, text);
                }
                Value::Any(inner) => *inner,
                Value::Html(markup) => {
                    let namespace = parent_namespace(cx.document(), state.group.marker());
                    let fragment = cx.parse_html(&markup, namespace);
                    let nodes = cx.document().children(fragment).to_vec();
                    return set_nodes(state, cx, nodes);
                }
                Value::Placeholder(placeholder) => {
                    let Placeholder { placeholder, value } = *placeholder;
                    self.dispatch(state, cx, placeholder, generation)?;
                    value
                }
                Value::Object(object) => match cx.transform(&object) {
                    Some(transformed) => transformed,
                    None => return Err(RenderError::unsupported("object", "node")),
                },
                other @ (Value::Stream(_) | Value::Listener(_)) => {
                    return Err(RenderError::unsupported(other.kind_name(), "node"))
                }
            };
        }
    }
}

impl Updater for NodeSlot {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        let value = match value {
            Value::Null => Value::Str(String::new()),
            other => other,
        };
        let mut state = self.0.borrow_mut();
        if state.last.as_ref().is_some_and(|last| last.same(&value)) {
            return Ok(false);
        }
        state.generation += 1;
        let generation = state.generation;
        self.dispatch(&mut state, cx, value.clone(), generation)?;
        state.last = Some(value);
        Ok(true)
    }
}

/// Mutates the single managed text node in place when there is one, and
/// replaces the managed nodes with a fresh text node otherwise.
fn set_text(
    state: &mut SlotState,
    cx: &mut RenderContext<'_>,
    text: String,
) -> Result<(), RenderError> {
    if let [node] = state.group.nodes() {
        let node = *node;
        if cx.document().is_text(node) {
            if cx.document().text(node) != Some(text.as_str()) {
                cx.document_mut().set_text(node, text)?;
            }
            return Ok(());
        }
    }
    let limit = cx.diff_limit();
    if !state.group.is_empty() {
        state.group.reconcile(cx.document_mut(), Vec::new(), limit)?;
    }
    let node = cx.document_mut().create_text(text);
    state.group.reconcile(cx.document_mut(), vec![node], limit)?;
    Ok(())
}

fn set_nodes(
    state: &mut SlotState,
    cx: &mut RenderContext<'_>,
    nodes: Vec<NodeId>,
) -> Result<(), RenderError> {
    let limit = cx.diff_limit();
    state.group.reconcile(cx.document_mut(), nodes, limit)?;
    Ok(())
}

/// Renders each invocation through a wire kept per key (or per position when
/// unkeyed), so reordered items keep their nodes and hole state.
fn render_templates(
    state: &mut SlotState,
    cx: &mut RenderContext<'_>,
    items: Vec<Value>,
) -> Result<(), RenderError> {
    let mut wires = HashMap::with_capacity(items.len());
    let mut nodes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Template(invocation) => {
                let key = invocation
                    .key()
                    .map(WireKey::Explicit)
                    .unwrap_or(WireKey::Index(index));
                let mut wire = state.wires.remove(&key).unwrap_or_default();
                nodes.extend(wire.render_nodes(cx, invocation)?);
                wires.insert(key, wire);
            }
            Value::Node(node) => nodes.extend(unwrap_fragment(cx.document(), node)),
            other => return Err(RenderError::unsupported(other.kind_name(), "template list")),
        }
    }
    state.wires = wires;
    set_nodes(state, cx, nodes)
}

fn flatten(items: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::List(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    flat
}

fn unwrap_fragment(document: &Document, node: NodeId) -> Vec<NodeId> {
    if document.is_fragment(node) {
        document.children(node).to_vec()
    } else {
        vec![node]
    }
}

fn parent_namespace(document: &Document, marker: NodeId) -> Namespace {
    document
        .parent(marker)
        .and_then(|parent| document.element(parent))
        .map(|element| element.namespace())
        .unwrap_or_default()
}
