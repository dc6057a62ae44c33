use std::rc::Rc;

use log::{debug, trace};

use crate::blueprint::{Blueprint, Compiler};
use crate::collections::{ordered_map, OrderedMap};
use crate::dom::Namespace;
use crate::error::ConstructionError;
use crate::value::{Invocation, Strings};

/// Identity of a template's static shape.
///
/// Fragment arrays with a stable address (one `static` per call site) are
/// keyed by that address. Arrays built at runtime are keyed by content, so two
/// equal arrays share a blueprint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Identity {
        address: usize,
        len: usize,
        namespace: Namespace,
    },
    Content {
        parts: Rc<[String]>,
        namespace: Namespace,
    },
}

impl CacheKey {
    pub fn of(invocation: &Invocation) -> Self {
        let namespace = invocation.namespace();
        match invocation.strings() {
            Strings::Static(parts) => CacheKey::Identity {
                address: parts.as_ptr() as usize,
                len: parts.len(),
                namespace,
            },
            Strings::Shared(parts) => CacheKey::Content {
                parts: parts.clone(),
                namespace,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Keep every blueprint for the lifetime of the cache.
    #[default]
    Unbounded,
    /// Keep at most this many blueprints, evicting the oldest first.
    Bounded(usize),
}

pub struct BlueprintCache {
    entries: OrderedMap<CacheKey, Rc<Blueprint>>,
    retention: Retention,
    compilations: usize,
}

impl BlueprintCache {
    pub fn new(retention: Retention) -> Self {
        Self {
            entries: ordered_map(),
            retention,
            compilations: 0,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Rc<Blueprint>> {
        self.entries.get(key).cloned()
    }

    pub fn get_or_compile(
        &mut self,
        invocation: &Invocation,
        compiler: &Compiler<'_>,
    ) -> Result<Rc<Blueprint>, ConstructionError> {
        let key = CacheKey::of(invocation);
        if let Some(blueprint) = self.entries.get(&key) {
            trace!("blueprint cache hit for {} fragments", invocation.strings().len());
            return Ok(blueprint.clone());
        }
        let blueprint = match invocation.strings() {
            Strings::Static(parts) => compiler.compile(&parts[..], invocation.namespace())?,
            Strings::Shared(parts) => compiler.compile(&parts[..], invocation.namespace())?,
        };
        let blueprint = Rc::new(blueprint);
        self.compilations += 1;
        debug!(
            "compiled blueprint with {} holes ({:?})",
            blueprint.hole_count(),
            invocation.namespace()
        );
        if let Retention::Bounded(limit) = self.retention {
            while self.entries.len() >= limit.max(1) {
                if self.entries.shift_remove_index(0).is_some() {
                    debug!("evicted oldest blueprint; {} remain", self.entries.len());
                }
            }
        }
        self.entries.insert(key, blueprint.clone());
        Ok(blueprint)
    }

    pub fn compilations(&self) -> usize {
        self.compilations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for BlueprintCache {
    fn default() -> Self {
        Self::new(Retention::Unbounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::Markers;
    use crate::markup::HtmlParser;
    use crate::value::{Invocation, Value};

    static GREETING: [&str; 2] = ["<p>", "</p>"];
    static FAREWELL: [&str; 2] = ["<b>", "</b>"];

    fn compile_with(cache: &mut BlueprintCache, invocation: &Invocation) -> Rc<Blueprint> {
        let markers = Markers::with_uid("_m;");
        let compiler = Compiler::new(&HtmlParser, &markers);
        cache
            .get_or_compile(invocation, &compiler)
            .expect("compile")
    }

    #[test]
    fn same_static_fragments_compile_once() {
        let mut cache = BlueprintCache::default();
        let first = compile_with(&mut cache, &Invocation::html(&GREETING, vec![Value::from(1)]));
        let second = compile_with(&mut cache, &Invocation::html(&GREETING, vec![Value::from(2)]));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn shared_fragments_are_keyed_by_content() {
        let mut cache = BlueprintCache::default();
        let a = Invocation::new(
            Strings::shared(["<i>", "</i>"]),
            vec![Value::from("a")],
            Namespace::Html,
        );
        let b = Invocation::new(
            Strings::shared(["<i>", "</i>"]),
            vec![Value::from("b")],
            Namespace::Html,
        );
        let first = compile_with(&mut cache, &a);
        let second = compile_with(&mut cache, &b);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn namespace_is_part_of_the_key() {
        let mut cache = BlueprintCache::default();
        compile_with(&mut cache, &Invocation::html(&GREETING, vec![Value::Null]));
        compile_with(&mut cache, &Invocation::svg(&GREETING, vec![Value::Null]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn bounded_retention_evicts_oldest() {
        let mut cache = BlueprintCache::new(Retention::Bounded(1));
        let greeting = Invocation::html(&GREETING, vec![Value::Null]);
        compile_with(&mut cache, &greeting);
        compile_with(&mut cache, &Invocation::html(&FAREWELL, vec![Value::Null]));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::of(&greeting)).is_none());
        compile_with(&mut cache, &greeting);
        assert_eq!(cache.compilations(), 3);
    }
}
