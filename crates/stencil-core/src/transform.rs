use std::rc::Rc;

use crate::collections::OrderedMap;
use crate::value::{Object, Value};

/// Turns an object value into something a node hole can render.
///
/// `payload` is the object's property named after the transformer; the whole
/// object is passed along for context.
pub trait Transformer {
    fn transform(&self, payload: &Value, object: &Object) -> Value;
}

impl<F> Transformer for F
where
    F: Fn(&Value, &Object) -> Value,
{
    fn transform(&self, payload: &Value, object: &Object) -> Value {
        self(payload, object)
    }
}

/// Registered transformers. Registration order is match priority.
#[derive(Default)]
pub struct Transformers {
    entries: OrderedMap<String, Rc<dyn Transformer>>,
}

impl Transformers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `transformer` under `name`. Redefining a name replaces the
    /// callback and keeps its priority.
    pub fn define(&mut self, name: impl Into<String>, transformer: impl Transformer + 'static) {
        self.entries.insert(name.into(), Rc::new(transformer));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the first transformer whose name is a property of `object`.
    pub fn transform(&self, object: &Object) -> Option<Value> {
        self.entries.iter().find_map(|(name, transformer)| {
            object
                .get(name)
                .map(|payload| transformer.transform(payload, object))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_match_wins() {
        let mut transformers = Transformers::new();
        transformers.define("upper", |payload: &Value, _: &Object| {
            Value::from(payload.as_text().unwrap_or_default().to_uppercase())
        });
        transformers.define("lower", |payload: &Value, _: &Object| {
            Value::from(payload.as_text().unwrap_or_default().to_lowercase())
        });
        let object = Object::new().with("lower", "MiXeD").with("upper", "MiXeD");
        let result = transformers.transform(&object).and_then(|v| v.as_text());
        assert_eq!(result.as_deref(), Some("MIXED"));
    }

    #[test]
    fn redefining_keeps_priority() {
        let mut transformers = Transformers::new();
        transformers.define("a", |_: &Value, _: &Object| Value::from("first"));
        transformers.define("b", |_: &Value, _: &Object| Value::from("b"));
        transformers.define("a", |_: &Value, _: &Object| Value::from("second"));
        assert_eq!(transformers.len(), 2);
        let object = Object::new().with("b", 1).with("a", 1);
        let result = transformers.transform(&object).and_then(|v| v.as_text());
        assert_eq!(result.as_deref(), Some("second"));
    }

    #[test]
    fn unknown_objects_do_not_match() {
        let transformers = Transformers::new();
        assert!(transformers.transform(&Object::new().with("x", 1)).is_none());
    }
}
