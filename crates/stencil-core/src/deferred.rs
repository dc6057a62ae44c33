//! Asynchronous and push-based hole values.
//!
//! A [`Deferred`] is an ordinary future that resolves to a [`Value`]; it is
//! shared, so every clone observes the same resolution. A [`Stream`] pushes
//! any number of values to its subscribers.

use std::cell::RefCell;
use std::fmt;
use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use indexmap::IndexMap;

use crate::value::Value;

enum DeferredState {
    Pending(Pin<Box<dyn Future<Output = Value>>>),
    /// The future is being polled further up the stack.
    Polling,
    Ready(Value),
}

#[derive(Clone)]
pub struct Deferred(Rc<RefCell<DeferredState>>);

impl Deferred {
    pub fn new(future: impl Future<Output = Value> + 'static) -> Self {
        Self(Rc::new(RefCell::new(DeferredState::Pending(Box::pin(future)))))
    }

    pub fn ready(value: impl Into<Value>) -> Self {
        Self(Rc::new(RefCell::new(DeferredState::Ready(value.into()))))
    }

    /// A deferred resolved by hand through the returned [`Resolver`].
    pub fn channel() -> (Deferred, Resolver) {
        let slot = Rc::new(RefCell::new(ChannelSlot::default()));
        let reader = slot.clone();
        let deferred = Deferred::new(poll_fn(move |cx| {
            let mut slot = reader.borrow_mut();
            match slot.value.take() {
                Some(value) => Poll::Ready(value),
                None => {
                    slot.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }));
        (deferred, Resolver(slot))
    }

    /// Resolves to a [`Value::List`] once every deferred item has resolved.
    /// Items that are not deferred pass through unchanged.
    pub fn all(items: Vec<Value>) -> Self {
        Deferred::new(async move {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(match item {
                    Value::Deferred(deferred) => deferred.await,
                    other => other,
                });
            }
            Value::List(resolved)
        })
    }

    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.0.borrow(), DeferredState::Ready(_))
    }

    /// The resolved value, if any.
    pub fn peek(&self) -> Option<Value> {
        match &*self.0.borrow() {
            DeferredState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn poll_shared(&self, cx: &mut Context<'_>) -> Poll<Value> {
        let mut future = {
            let mut state = self.0.borrow_mut();
            match std::mem::replace(&mut *state, DeferredState::Polling) {
                DeferredState::Ready(value) => {
                    *state = DeferredState::Ready(value.clone());
                    return Poll::Ready(value);
                }
                DeferredState::Polling => return Poll::Pending,
                DeferredState::Pending(future) => future,
            }
        };
        let polled = future.as_mut().poll(cx);
        let mut state = self.0.borrow_mut();
        match polled {
            Poll::Ready(value) => {
                *state = DeferredState::Ready(value.clone());
                Poll::Ready(value)
            }
            Poll::Pending => {
                *state = DeferredState::Pending(future);
                Poll::Pending
            }
        }
    }
}

impl Future for Deferred {
    type Output = Value;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Value> {
        self.poll_shared(cx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            DeferredState::Ready(value) => f.debug_tuple("Deferred").field(value).finish(),
            _ => f.write_str("Deferred(<pending>)"),
        }
    }
}

#[derive(Default)]
struct ChannelSlot {
    value: Option<Value>,
    waker: Option<Waker>,
}

/// Completes the [`Deferred`] created alongside it.
pub struct Resolver(Rc<RefCell<ChannelSlot>>);

impl Resolver {
    pub fn resolve(self, value: impl Into<Value>) {
        let waker = {
            let mut slot = self.0.borrow_mut();
            slot.value = Some(value.into());
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

type Observer = Rc<dyn Fn(&Value)>;

#[derive(Default)]
struct StreamInner {
    observers: IndexMap<u64, Observer>,
    next_id: u64,
}

/// Push-based source of values.
#[derive(Clone, Default)]
pub struct Stream(Rc<RefCell<StreamInner>>);

impl Stream {
    pub fn channel() -> (Stream, StreamSink) {
        let stream = Stream::default();
        (stream.clone(), StreamSink(stream))
    }

    /// Registers `observer` until the returned subscription is dropped.
    pub fn subscribe(&self, observer: impl Fn(&Value) + 'static) -> Subscription {
        let mut inner = self.0.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.insert(id, Rc::new(observer));
        Subscription {
            stream: Rc::downgrade(&self.0),
            id,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.0.borrow().observers.len()
    }

    pub fn ptr_eq(&self, other: &Stream) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({} observers)", self.observer_count())
    }
}

/// Emitting side of a [`Stream`].
#[derive(Clone)]
pub struct StreamSink(Stream);

impl StreamSink {
    pub fn emit(&self, value: impl Into<Value>) {
        let value = value.into();
        let observers: Vec<Observer> = self.0 .0.borrow().observers.values().cloned().collect();
        for observer in observers {
            observer(&value);
        }
    }

    pub fn stream(&self) -> &Stream {
        &self.0
    }
}

pub struct Subscription {
    stream: Weak<RefCell<StreamInner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.upgrade() {
            stream.borrow_mut().observers.shift_remove(&self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
