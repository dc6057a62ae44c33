use std::cell::RefCell;
use std::rc::Rc;

use crate::deferred::{Stream, Subscription};
use crate::dom::NodeId;
use crate::error::RenderError;
use crate::render::RenderContext;
use crate::value::Value;

/// Stateful binding of one hole.
///
/// `apply` performs the smallest mutation that makes the document reflect
/// `value` and reports whether anything changed. Applying the value that was
/// applied last is a no-op.
pub trait Updater {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError>;
}

/// Writes a hole inside a raw-text element.
pub struct TextUpdater {
    node: NodeId,
    last: Option<Value>,
}

impl TextUpdater {
    pub fn new(node: NodeId) -> Self {
        Self { node, last: None }
    }
}

impl Updater for TextUpdater {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        if self.last.as_ref().is_some_and(|last| last.same(&value)) {
            return Ok(false);
        }
        let text = match &value {
            Value::Text(inner) => inner.as_text(),
            Value::List(items) => items.iter().map(Value::as_text).collect::<Option<String>>(),
            other => other.as_text(),
        }
        .ok_or_else(|| RenderError::unsupported(value.kind_name(), "text"))?;
        if cx.document().text(self.node) != Some(text.as_str()) {
            cx.document_mut().set_text(self.node, text)?;
        }
        self.last = Some(value);
        Ok(true)
    }
}

/// Lets any updater accept [`Value::Stream`].
///
/// A stream is subscribed and each emission is applied to the wrapped updater
/// through the runtime queue. A different stream or a plain value drops the
/// previous subscription first.
pub struct Subscribed<U> {
    inner: Rc<RefCell<U>>,
    subscription: Option<(Stream, Subscription)>,
}

impl<U: Updater + 'static> Subscribed<U> {
    pub fn new(inner: U) -> Self {
        Self {
            inner: Rc::new(RefCell::new(inner)),
            subscription: None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    fn subscribe(&mut self, cx: &mut RenderContext<'_>, stream: Stream) {
        self.subscription = None;
        let target = Rc::downgrade(&self.inner);
        let runtime = cx.runtime().clone();
        let subscription = stream.subscribe(move |value| {
            let target = target.clone();
            let value = value.clone();
            runtime.enqueue_update(Box::new(move |cx| {
                if let Some(target) = target.upgrade() {
                    target.borrow_mut().apply(cx, value)?;
                }
                Ok(())
            }));
        });
        self.subscription = Some((stream, subscription));
    }
}

impl<U: Updater + 'static> Updater for Subscribed<U> {
    fn apply(&mut self, cx: &mut RenderContext<'_>, value: Value) -> Result<bool, RenderError> {
        match value {
            Value::Stream(stream) => {
                let current = self
                    .subscription
                    .as_ref()
                    .is_some_and(|(active, _)| active.ptr_eq(&stream));
                if current {
                    return Ok(false);
                }
                self.subscribe(cx, stream);
                Ok(true)
            }
            other => {
                self.subscription = None;
                self.inner.borrow_mut().apply(cx, other)
            }
        }
    }
}
