use std::fmt;

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    NotAttached { id: NodeId },
    TypeMismatch { id: NodeId, expected: &'static str },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::NotAttached { id } => write!(f, "node {id} is not attached where expected"),
            NodeError::TypeMismatch { id, expected } => {
                write!(f, "node {id} type mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for NodeError {}

/// A template whose static shape cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The fragment before an attribute-position hole does not end in `name=`.
    AttributeName { fragment: String },
    /// Parsing the generated markup did not yield one marker per hole.
    MarkerMismatch { expected: usize, found: usize },
    /// A hole's address does not lead to a node in the instantiated tree.
    UnresolvedAddress { address: String },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionError::AttributeName { fragment } => write!(
                f,
                "could not get the attribute name within the fragment {fragment:?}"
            ),
            ConstructionError::MarkerMismatch { expected, found } => write!(
                f,
                "template has {expected} holes but its markup produced {found} markers"
            ),
            ConstructionError::UnresolvedAddress { address } => {
                write!(f, "hole address {address} does not exist in the instance")
            }
        }
    }
}

impl std::error::Error for ConstructionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Construction(ConstructionError),
    /// A hole received a value of a shape it cannot render.
    UnsupportedValue {
        kind: &'static str,
        position: &'static str,
    },
    /// Fragment count must be exactly one more than the value count.
    Arity { fragments: usize, values: usize },
    Node(NodeError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Construction(err) => write!(f, "template construction failed: {err}"),
            RenderError::UnsupportedValue { kind, position } => {
                write!(f, "unsupported {kind} value in {position}")
            }
            RenderError::Arity { fragments, values } => write!(
                f,
                "template has {fragments} fragments but {values} values were supplied"
            ),
            RenderError::Node(err) => write!(f, "document error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Construction(err) => Some(err),
            RenderError::Node(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConstructionError> for RenderError {
    fn from(err: ConstructionError) -> Self {
        RenderError::Construction(err)
    }
}

impl From<NodeError> for RenderError {
    fn from(err: NodeError) -> Self {
        RenderError::Node(err)
    }
}

impl RenderError {
    pub(crate) fn unsupported(kind: &'static str, position: &'static str) -> Self {
        RenderError::UnsupportedValue { kind, position }
    }
}
