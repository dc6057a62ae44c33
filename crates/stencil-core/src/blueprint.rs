//! Blueprint compilation.
//!
//! A template's static fragments are scanned once to classify every hole,
//! joined into markup with the sentinel markers in place of the holes, parsed,
//! and walked a single time to turn marker occurrences into [`Note`]s. The
//! walk strips every marker so the resulting skeleton can be cloned as is.

use std::fmt;

use crate::dom::{Document, Namespace, NodeId, NodeKind};
use crate::error::ConstructionError;
use crate::marker::Markers;
use crate::markup::MarkupParser;

/// Child-index path from a blueprint root to one node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address {
    steps: Vec<usize>,
}

impl Address {
    pub fn new(steps: Vec<usize>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Follows the path from `root`. Returns `None` when the tree does not have
    /// the same shape.
    pub fn resolve(&self, document: &Document, root: NodeId) -> Option<NodeId> {
        self.steps
            .iter()
            .try_fold(root, |node, &step| document.children(node).get(step).copied())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                write!(f, "/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoleKind {
    /// Content position; the address points at the comment anchoring the hole.
    Node,
    /// Attribute value; the address points at the owner element.
    Attribute,
    /// Inside a raw-text element; the address points at the text node that
    /// holds the hole's value.
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub kind: HoleKind,
    pub address: Address,
    /// Attribute name as written in the template, for attribute holes.
    pub name: Option<String>,
}

/// Compiled, immutable shape of one template.
pub struct Blueprint {
    document: Document,
    root: NodeId,
    notes: Vec<Note>,
    namespace: Namespace,
}

impl Blueprint {
    /// Document holding the skeleton. Only the subtree under [`root`] is
    /// meaningful.
    ///
    /// [`root`]: Blueprint::root
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn hole_count(&self) -> usize {
        self.notes.len()
    }

    /// Markup of the skeleton with every hole removed.
    pub fn skeleton_html(&self) -> String {
        self.document.inner_html(self.root)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("skeleton", &self.skeleton_html())
            .field("notes", &self.notes)
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// A hole as classified from the static fragments alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScannedHole {
    Node,
    Attribute(String),
}

/// Joins `strings` into parseable markup with a marker at every hole.
pub fn scan<S: AsRef<str>>(
    strings: &[S],
    markers: &Markers,
) -> Result<(String, Vec<ScannedHole>), ConstructionError> {
    let mut markup = String::new();
    let mut holes = Vec::with_capacity(strings.len().saturating_sub(1));
    let mut in_text = true;
    let Some((last, leading)) = strings.split_last() else {
        return Ok((markup, holes));
    };
    for fragment in leading {
        let fragment = fragment.as_ref();
        markup.push_str(fragment);
        match tag_state(fragment) {
            TagState::Closed => in_text = true,
            TagState::Open => in_text = false,
            TagState::Unchanged => {}
        }
        if in_text {
            markup.push_str(markers.node_markup());
            holes.push(ScannedHole::Node);
        } else {
            let name = extract_attribute_name(fragment).ok_or_else(|| {
                ConstructionError::AttributeName {
                    fragment: fragment.to_string(),
                }
            })?;
            markup.push_str(markers.attribute());
            holes.push(ScannedHole::Attribute(name.to_string()));
        }
    }
    markup.push_str(last.as_ref());
    Ok((markup, holes))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagState {
    /// A tag opens after the last `>`, so the fragment ends inside it.
    Open,
    /// The fragment closes its last tag.
    Closed,
    /// No tag delimiters at all; the previous state carries over.
    Unchanged,
}

fn tag_state(fragment: &str) -> TagState {
    let close = fragment.rfind('>');
    let after = close.map(|index| index + 1).unwrap_or(0);
    if fragment[after..].contains('<') {
        TagState::Open
    } else if close.is_some() {
        TagState::Closed
    } else {
        TagState::Unchanged
    }
}

fn is_markup_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0c' | '\r')
}

fn is_name_char(c: char) -> bool {
    !(c <= '\x1f'
        || ('\x7f'..='\u{9f}').contains(&c)
        || is_markup_space(c)
        || matches!(c, '"' | '\'' | '>' | '=' | '/'))
}

/// Name of the attribute whose value a fragment ends on, as in `<a href="`.
/// The name must be preceded by whitespace.
pub fn extract_attribute_name(fragment: &str) -> Option<&str> {
    let rest = fragment
        .strip_suffix(['"', '\''])
        .unwrap_or(fragment)
        .trim_end_matches(is_markup_space);
    let rest = rest.strip_suffix('=')?.trim_end_matches(is_markup_space);
    let start = rest
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_name_char(c))
        .last()
        .map(|(index, _)| index)?;
    let preceding = rest[..start].chars().next_back()?;
    preceding.is_whitespace().then(|| &rest[start..])
}

enum Occurrence {
    Node(Vec<usize>),
    Attribute(Vec<usize>),
    Text(Vec<usize>),
}

pub struct Compiler<'a> {
    parser: &'a dyn MarkupParser,
    markers: &'a Markers,
}

impl<'a> Compiler<'a> {
    pub fn new(parser: &'a dyn MarkupParser, markers: &'a Markers) -> Self {
        Self { parser, markers }
    }

    pub fn compile<S: AsRef<str>>(
        &self,
        strings: &[S],
        namespace: Namespace,
    ) -> Result<Blueprint, ConstructionError> {
        let (markup, holes) = scan(strings, self.markers)?;
        let mut document = Document::new();
        let root = self.parser.parse_fragment(&mut document, &markup, namespace);

        let mut walk = Walk {
            markers: self.markers,
            occurrences: Vec::with_capacity(holes.len()),
            marker_attributes: Vec::new(),
            path: Vec::new(),
        };
        walk.visit_children(&mut document, root);
        let Walk {
            occurrences,
            marker_attributes,
            ..
        } = walk;

        if occurrences.len() != holes.len() {
            return Err(ConstructionError::MarkerMismatch {
                expected: holes.len(),
                found: occurrences.len(),
            });
        }
        let mut notes = Vec::with_capacity(holes.len());
        for (hole, occurrence) in holes.into_iter().zip(occurrences) {
            let note = match (hole, occurrence) {
                (ScannedHole::Node, Occurrence::Node(steps)) => Note {
                    kind: HoleKind::Node,
                    address: Address::new(steps),
                    name: None,
                },
                (ScannedHole::Node, Occurrence::Text(steps)) => Note {
                    kind: HoleKind::Text,
                    address: Address::new(steps),
                    name: None,
                },
                (ScannedHole::Attribute(name), Occurrence::Attribute(steps)) => Note {
                    kind: HoleKind::Attribute,
                    address: Address::new(steps),
                    name: Some(name),
                },
                _ => {
                    return Err(ConstructionError::MarkerMismatch {
                        expected: notes.len() + 1,
                        found: notes.len(),
                    })
                }
            };
            notes.push(note);
        }

        for (element, name) in marker_attributes {
            // Recorded from live elements of this document during the walk.
            let _ = document.remove_attribute(element, &name);
        }

        Ok(Blueprint {
            document,
            root,
            notes,
            namespace,
        })
    }
}

struct Walk<'a> {
    markers: &'a Markers,
    occurrences: Vec<Occurrence>,
    marker_attributes: Vec<(NodeId, String)>,
    path: Vec<usize>,
}

impl Walk<'_> {
    fn visit_children(&mut self, document: &mut Document, parent: NodeId) {
        let mut index = 0;
        while let Some(&child) = document.children(parent).get(index) {
            self.path.push(index);
            let mut consumed = 1;
            match document.kind(child) {
                Some(NodeKind::Element(element)) => {
                    let mut seen: Vec<&str> = Vec::new();
                    for attribute in element.attributes() {
                        if attribute.value != self.markers.attribute()
                            || seen.contains(&attribute.name.as_str())
                        {
                            continue;
                        }
                        seen.push(&attribute.name);
                        self.occurrences
                            .push(Occurrence::Attribute(self.path.clone()));
                        self.marker_attributes
                            .push((child, attribute.name.clone()));
                    }
                    self.visit_children(document, child);
                }
                Some(NodeKind::Comment(data)) if data == self.markers.node() => {
                    self.occurrences.push(Occurrence::Node(self.path.clone()));
                }
                Some(NodeKind::Text(data)) if data.contains(self.markers.node_markup()) => {
                    let data = data.clone();
                    consumed = self.split_text(document, parent, child, index, &data);
                }
                _ => {}
            }
            self.path.pop();
            index += consumed;
        }
    }

    /// Replaces a text node carrying literal markers with static text runs and
    /// one empty text node per marker. Returns how many nodes took its place.
    fn split_text(
        &mut self,
        document: &mut Document,
        parent: NodeId,
        child: NodeId,
        index: usize,
        data: &str,
    ) -> usize {
        let pieces: Vec<&str> = data.split(self.markers.node_markup()).collect();
        let holes = pieces.len() - 1;
        let mut replacement = Vec::with_capacity(pieces.len() + holes);
        for (position, piece) in pieces.iter().enumerate() {
            if !piece.is_empty() {
                replacement.push(document.create_text(*piece));
            }
            if position < holes {
                let mut steps = self.path.clone();
                if let Some(last) = steps.last_mut() {
                    *last = index + replacement.len();
                }
                self.occurrences.push(Occurrence::Text(steps));
                replacement.push(document.create_text(""));
            }
        }
        for &node in &replacement {
            let _ = document.insert_before(parent, node, Some(child));
        }
        let _ = document.remove_child(parent, child);
        replacement.len()
    }
}

#[cfg(test)]
#[path = "tests/blueprint_tests.rs"]
mod tests;
