//! Attribute-position hole binders.
//!
//! The hole's attribute name picks the binder:
//! - `name$` sets or removes the literal attribute `name`;
//! - `onevent` and `on-event` attach a listener for `event`, lower-cased;
//! - anything else assigns a property when the element exposes one of that
//!   name, and falls back to the attribute otherwise.

use crate::dom::{Document, Listener, Namespace, NodeId};
use crate::error::RenderError;
use crate::render::RenderContext;
use crate::updater::{Subscribed, Updater};
use crate::value::Value;

pub struct AttributeUpdater {
    element: NodeId,
    name: String,
    last: Option<Value>,
}

impl AttributeUpdater {
    pub fn new(element: NodeId, name: impl Into<String>) -> Self {
        Self {
            element,
            name: name.into(),
            last: None,
        }
    }
}

impl Updater for AttributeUpdater {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        let value = match value {
            Value::Bool(true) => Value::Str(String::new()),
            Value::Bool(false) => Value::Null,
            other => other,
        };
        let text = match &value {
            Value::Null => None,
            other => Some(
                other
                    .as_text()
                    .ok_or_else(|| RenderError::unsupported(other.kind_name(), "attribute"))?,
            ),
        };
        let present = cx.document().attribute(self.element, &self.name);
        let unchanged = self.last.as_ref().is_some_and(|last| last.same(&value))
            && present == text.as_deref();
        if unchanged {
            return Ok(false);
        }
        match text {
            Some(text) => cx
                .document_mut()
                .set_attribute(self.element, &self.name, text)?,
            None => {
                cx.document_mut().remove_attribute(self.element, &self.name)?;
            }
        }
        self.last = Some(value);
        Ok(true)
    }
}

pub struct PropertyUpdater {
    element: NodeId,
    name: String,
    last: Option<Value>,
}

impl PropertyUpdater {
    pub fn new(element: NodeId, name: impl Into<String>) -> Self {
        Self {
            element,
            name: name.into(),
            last: None,
        }
    }
}

impl Updater for PropertyUpdater {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        let value = match value {
            Value::Null => Value::Str(String::new()),
            other => other,
        };
        if value.is_primitive() {
            let current = cx.document().property(self.element, &self.name);
            let unchanged = self.last.as_ref().is_some_and(|last| last.same(&value))
                && current.is_some_and(|current| current.same(&value));
            if unchanged {
                return Ok(false);
            }
        }
        cx.document_mut()
            .set_property(self.element, &self.name, value.clone())?;
        self.last = Some(value);
        Ok(true)
    }
}

pub struct EventUpdater {
    element: NodeId,
    event: String,
    current: Option<Listener>,
}

impl EventUpdater {
    pub fn new(element: NodeId, event: impl Into<String>) -> Self {
        Self {
            element,
            event: event.into(),
            current: None,
        }
    }
}

impl Updater for EventUpdater {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        let next = match value {
            Value::Listener(listener) => Some(listener),
            Value::Null | Value::Bool(false) => None,
            other => return Err(RenderError::unsupported(other.kind_name(), "event")),
        };
        let unchanged = match (&self.current, &next) {
            (Some(current), Some(next)) => current.ptr_eq(next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(false);
        }
        if let Some(previous) = self.current.take() {
            cx.document_mut()
                .remove_listener(self.element, &self.event, &previous)?;
        }
        if let Some(listener) = &next {
            cx.document_mut()
                .add_listener(self.element, &self.event, listener.clone())?;
        }
        self.current = next;
        Ok(true)
    }
}

/// Picks the binder for an attribute hole named `name` on `element`.
pub fn bind_attribute(document: &Document, element: NodeId, name: &str) -> Box<dyn Updater> {
    if let Some(event) = name.strip_prefix("on") {
        let event = event.strip_prefix('-').unwrap_or(event).to_lowercase();
        return Box::new(Subscribed::new(EventUpdater::new(element, event)));
    }
    let html = document
        .element(element)
        .is_some_and(|element| element.namespace() == Namespace::Html);
    let attribute_name = |name: &str| {
        if html {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    };
    if let Some(literal) = name.strip_suffix('$') {
        return Box::new(Subscribed::new(AttributeUpdater::new(
            element,
            attribute_name(literal),
        )));
    }
    if document.has_property(element, name) {
        Box::new(Subscribed::new(PropertyUpdater::new(element, name)))
    } else {
        Box::new(Subscribed::new(AttributeUpdater::new(
            element,
            attribute_name(name),
        )))
    }
}
