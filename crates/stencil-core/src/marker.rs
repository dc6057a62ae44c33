use std::time::{SystemTime, UNIX_EPOCH};

use crate::hash::random_hash;

/// The sentinel pair written into generated markup so holes can be found
/// again after parsing.
///
/// `uid` is the attribute-position sentinel. The node-position sentinel is a
/// comment whose data is the same `uid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Markers {
    uid: String,
    node_markup: String,
}

impl Markers {
    /// Generates a sentinel unlikely to collide with any authored content.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let seed = random_hash(&nanos);
        Self::with_uid(format!("_stencil_{seed:016x};"))
    }

    pub fn with_uid(uid: impl Into<String>) -> Self {
        let uid = uid.into();
        let node_markup = format!("<!--{uid}-->");
        Self { uid, node_markup }
    }

    /// Value written into an attribute-position hole.
    pub fn attribute(&self) -> &str {
        &self.uid
    }

    /// Comment data of a parsed node-position hole.
    pub fn node(&self) -> &str {
        &self.uid
    }

    /// Markup written into a node-position hole.
    pub fn node_markup(&self) -> &str {
        &self.node_markup
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::generate()
    }
}
