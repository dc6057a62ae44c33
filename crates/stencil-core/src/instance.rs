use crate::binding::bind_attribute;
use crate::blueprint::{Blueprint, HoleKind, Note};
use crate::collections::map::HashSet;
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{ConstructionError, NodeError, RenderError};
use crate::render::RenderContext;
use crate::slot::NodeSlot;
use crate::updater::{Subscribed, TextUpdater, Updater};
use crate::value::Value;

enum TopLevel {
    Static(NodeId),
    /// A node hole directly under the root; its managed nodes precede the
    /// marker.
    Slot(NodeSlot),
}

/// Live nodes of one template plus one updater per hole, in hole order.
pub struct TemplateInstance {
    root: NodeId,
    top_level: Vec<TopLevel>,
    updaters: Vec<Box<dyn Updater>>,
}

impl TemplateInstance {
    /// Copies the blueprint skeleton into the live document. The copy starts
    /// out under a detached fragment, returned by [`root`](Self::root).
    pub fn instantiate(
        cx: &mut RenderContext<'_>,
        blueprint: &Blueprint,
    ) -> Result<Self, RenderError> {
        let root = cx
            .document_mut()
            .import(blueprint.document(), blueprint.root())?;
        Self::bind(cx, blueprint, root)
    }

    /// Takes over the existing children of `container`, creating only what
    /// does not match the skeleton.
    pub fn adopt(
        cx: &mut RenderContext<'_>,
        blueprint: &Blueprint,
        container: NodeId,
    ) -> Result<Self, RenderError> {
        let marker = cx.markers().attribute().to_string();
        let bound = bound_attributes(blueprint);
        let adoption = Adoption {
            source: blueprint.document(),
            marker: &marker,
            bound: &bound,
        };
        adoption.children(cx.document_mut(), blueprint.root(), container)?;
        Self::bind(cx, blueprint, container)
    }

    fn bind(
        cx: &mut RenderContext<'_>,
        blueprint: &Blueprint,
        root: NodeId,
    ) -> Result<Self, RenderError> {
        let mut top_level: Vec<TopLevel> = cx
            .document()
            .children(root)
            .iter()
            .map(|&node| TopLevel::Static(node))
            .collect();
        let mut updaters: Vec<Box<dyn Updater>> = Vec::with_capacity(blueprint.hole_count());
        for note in blueprint.notes() {
            let node = resolve_note(cx.document(), root, note)?;
            let updater: Box<dyn Updater> = match note.kind {
                HoleKind::Node => {
                    let slot = NodeSlot::new(node);
                    if let [index] = note.address.steps() {
                        if let Some(entry) = top_level.get_mut(*index) {
                            *entry = TopLevel::Slot(slot.clone());
                        }
                    }
                    Box::new(Subscribed::new(slot))
                }
                HoleKind::Attribute => {
                    bind_attribute(cx.document(), node, note.name.as_deref().unwrap_or_default())
                }
                HoleKind::Text => Box::new(Subscribed::new(TextUpdater::new(node))),
            };
            updaters.push(updater);
        }
        Ok(Self {
            root,
            top_level,
            updaters,
        })
    }

    /// Feeds `values[i]` to the updater of hole `i`, in order.
    pub fn update(
        &mut self,
        cx: &mut RenderContext<'_>,
        values: Vec<Value>,
    ) -> Result<(), RenderError> {
        if values.len() != self.updaters.len() {
            return Err(RenderError::Arity {
                fragments: self.updaters.len() + 1,
                values: values.len(),
            });
        }
        for (updater, value) in self.updaters.iter_mut().zip(values) {
            updater.apply(cx, value)?;
        }
        Ok(())
    }

    /// Current top-level nodes, including the content of top-level node holes.
    pub fn content(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.top_level.len());
        for entry in &self.top_level {
            match entry {
                TopLevel::Static(node) => nodes.push(*node),
                TopLevel::Slot(slot) => {
                    nodes.extend(slot.managed_nodes());
                    nodes.push(slot.marker());
                }
            }
        }
        nodes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn hole_count(&self) -> usize {
        self.updaters.len()
    }
}

fn corresponds(document: &Document, live: NodeId, source: &Document, template: NodeId) -> bool {
    match (document.kind(live), source.kind(template)) {
        (Some(NodeKind::Element(live)), Some(NodeKind::Element(template))) => {
            live.name().eq_ignore_ascii_case(template.name())
        }
        (Some(NodeKind::Text(_)), Some(NodeKind::Text(_)))
        | (Some(NodeKind::Comment(_)), Some(NodeKind::Comment(_))) => true,
        _ => false,
    }
}

pub(crate) fn resolve_note(
    document: &Document,
    root: NodeId,
    note: &Note,
) -> Result<NodeId, ConstructionError> {
    note.address
        .resolve(document, root)
        .ok_or_else(|| ConstructionError::UnresolvedAddress {
            address: note.address.to_string(),
        })
}

/// Attribute names written by attribute holes, keyed by the skeleton element
/// that carries them.
fn bound_attributes(blueprint: &Blueprint) -> HashSet<(NodeId, String)> {
    let source = blueprint.document();
    blueprint
        .notes()
        .iter()
        .filter(|note| note.kind == HoleKind::Attribute)
        .filter_map(|note| {
            let element = note.address.resolve(source, blueprint.root())?;
            let name = note.name.as_deref()?;
            let name = name.strip_suffix('$').unwrap_or(name);
            Some((element, name.to_ascii_lowercase()))
        })
        .collect()
}

struct Adoption<'a> {
    source: &'a Document,
    marker: &'a str,
    bound: &'a HashSet<(NodeId, String)>,
}

impl Adoption<'_> {
    /// Walks `live` in lockstep with `template`, keeping matching nodes and
    /// importing the rest from the skeleton.
    fn children(
        &self,
        document: &mut Document,
        template: NodeId,
        live: NodeId,
    ) -> Result<(), NodeError> {
        let wanted = self.source.children(template).to_vec();
        for (index, &expected) in wanted.iter().enumerate() {
            let existing = document.children(live).get(index).copied();
            match existing {
                Some(node) if corresponds(document, node, self.source, expected) => {
                    match self.source.kind(expected) {
                        Some(NodeKind::Element(_)) => {
                            self.attributes(document, expected, node)?;
                            self.children(document, expected, node)?;
                        }
                        Some(NodeKind::Text(data)) | Some(NodeKind::Comment(data)) => {
                            if document.text(node) != Some(data.as_str()) {
                                document.set_text(node, data.as_str())?;
                            }
                        }
                        _ => {}
                    }
                }
                _ => {
                    let imported = document.import(self.source, expected)?;
                    document.insert_before(live, imported, existing)?;
                    if let Some(node) = existing {
                        document.remove_child(live, node)?;
                    }
                }
            }
        }
        while document.children(live).len() > wanted.len() {
            if let Some(&extra) = document.children(live).last() {
                document.remove_child(live, extra)?;
            }
        }
        Ok(())
    }

    /// Copies the skeleton's attributes onto `node` and drops every other
    /// attribute that no hole writes.
    fn attributes(
        &self,
        document: &mut Document,
        template: NodeId,
        node: NodeId,
    ) -> Result<(), NodeError> {
        let Some(element) = self.source.element(template) else {
            return Ok(());
        };
        for attribute in element.attributes() {
            if document.attribute(node, &attribute.name) != Some(attribute.value.as_str()) {
                document.set_attribute(node, &attribute.name, &*attribute.value)?;
            }
        }
        let stray: Vec<String> = document
            .attributes(node)
            .iter()
            .filter(|attribute| {
                if attribute.value == self.marker {
                    return true;
                }
                let in_skeleton = element
                    .attributes()
                    .iter()
                    .any(|skeleton| skeleton.name.eq_ignore_ascii_case(&attribute.name));
                let bound = self
                    .bound
                    .contains(&(template, attribute.name.to_ascii_lowercase()));
                !in_skeleton && !bound
            })
            .map(|attribute| attribute.name.clone())
            .collect();
        for name in stray {
            document.remove_attribute(node, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/instance_tests.rs"]
mod tests;
