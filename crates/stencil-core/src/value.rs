//! Values fed into template holes.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::collections::OrderedMap;
use crate::deferred::{Deferred, Stream};
use crate::dom::{Listener, Namespace, NodeId};
use crate::error::RenderError;
use crate::hash::hash_one;

/// Explicit identity of a nested invocation.
pub type Key = u64;

/// Static fragments of a template.
#[derive(Clone, Debug)]
pub enum Strings {
    /// One array per call site; its address identifies the template.
    Static(&'static [&'static str]),
    /// Built at runtime; identified by content.
    Shared(Rc<[String]>),
}

impl Strings {
    pub fn shared<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Strings::Shared(parts.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Strings::Static(parts) => parts.len(),
            Strings::Shared(parts) => parts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            Strings::Static(parts) => parts.get(index).copied(),
            Strings::Shared(parts) => parts.get(index).map(String::as_str),
        }
    }
}

/// One call of a template: static fragments interleaved with values.
#[derive(Clone, Debug)]
pub struct Invocation {
    strings: Strings,
    values: Vec<Value>,
    namespace: Namespace,
    key: Option<Key>,
}

impl Invocation {
    pub fn new(strings: Strings, values: Vec<Value>, namespace: Namespace) -> Self {
        Self {
            strings,
            values,
            namespace,
            key: None,
        }
    }

    pub fn html(strings: &'static [&'static str], values: Vec<Value>) -> Self {
        Self::new(Strings::Static(strings), values, Namespace::Html)
    }

    pub fn svg(strings: &'static [&'static str], values: Vec<Value>) -> Self {
        Self::new(Strings::Static(strings), values, Namespace::Svg)
    }

    /// Tags the invocation with an identity that survives reordering inside a
    /// list.
    pub fn keyed<K: Hash>(mut self, key: K) -> Self {
        self.key = Some(hash_one(&key));
        self
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    pub fn check_arity(&self) -> Result<(), RenderError> {
        if self.strings.len() == self.values.len() + 1 {
            Ok(())
        } else {
            Err(RenderError::Arity {
                fragments: self.strings.len(),
                values: self.values.len(),
            })
        }
    }
}

/// Ordered property bag, matched against registered transformers by name.
#[derive(Clone, Default)]
pub struct Object(Rc<OrderedMap<String, Value>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut entries = Rc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone());
        entries.insert(name.into(), value.into());
        Object(Rc::new(entries))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Content rendered right away while `value` is still pending.
#[derive(Clone, Debug)]
pub struct Placeholder {
    pub placeholder: Value,
    pub value: Value,
}

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Node(NodeId),
    List(Vec<Value>),
    Template(Invocation),
    Deferred(Deferred),
    Stream(Stream),
    /// Always rendered as escaped text.
    Text(Box<Value>),
    /// Dispatched as if the wrapper were not there.
    Any(Box<Value>),
    /// Parsed as markup and inserted.
    Html(String),
    Placeholder(Box<Placeholder>),
    Object(Object),
    Listener(Listener),
}

impl Value {
    pub fn node(id: NodeId) -> Self {
        Value::Node(id)
    }

    pub fn text(value: impl Into<Value>) -> Self {
        Value::Text(Box::new(value.into()))
    }

    pub fn any(value: impl Into<Value>) -> Self {
        Value::Any(Box::new(value.into()))
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Value::Html(markup.into())
    }

    pub fn placeholder(placeholder: impl Into<Value>, value: impl Into<Value>) -> Self {
        Value::Placeholder(Box::new(Placeholder {
            placeholder: placeholder.into(),
            value: value.into(),
        }))
    }

    pub fn listener(callback: impl Fn(&crate::dom::Event) + 'static) -> Self {
        Value::Listener(Listener::new(callback))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Strings, numbers, booleans and null.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Node(_) => "node",
            Value::List(_) => "list",
            Value::Template(_) => "template",
            Value::Deferred(_) => "deferred",
            Value::Stream(_) => "stream",
            Value::Text(_) => "text",
            Value::Any(_) => "any",
            Value::Html(_) => "html",
            Value::Placeholder(_) => "placeholder",
            Value::Object(_) => "object",
            Value::Listener(_) => "listener",
        }
    }

    /// Text form of a primitive. `None` for everything else.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Number(number) => Some(format_number(*number)),
            Value::Str(text) => Some(text.clone()),
            _ => None,
        }
    }

    /// Whether re-applying `other` after `self` can be skipped.
    ///
    /// Templates are never the same: their nested values may have changed.
    /// Shared handles compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same(b))
            }
            (Value::Template(_), Value::Template(_)) => false,
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            (Value::Stream(a), Value::Stream(b)) => a.ptr_eq(b),
            (Value::Text(a), Value::Text(b)) => a.same(b),
            (Value::Any(a), Value::Any(b)) => a.same(b),
            (Value::Html(a), Value::Html(b)) => a == b,
            (Value::Placeholder(a), Value::Placeholder(b)) => {
                a.placeholder.same(&b.placeholder) && a.value.same(&b.value)
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Listener(a), Value::Listener(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Shortest round-trip digits, laid out the way script engines print numbers:
/// plain notation for decimal exponents in `-7..21`, exponent notation outside.
fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if number == 0.0 {
        return "0".to_string();
    }
    let sign = if number < 0.0 { "-" } else { "" };
    let scientific = format!("{:e}", number.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let count = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exponent + 1;

    let body = if count <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - count) as usize))
    } else if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{whole}.{fraction}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(-point as usize))
    } else {
        let exponent_sign = if point > 0 { "+" } else { "-" };
        let magnitude = (point - 1).abs();
        match digits.split_at(1) {
            (first, "") => format!("{first}e{exponent_sign}{magnitude}"),
            (first, rest) => format!("{first}.{rest}e{exponent_sign}{magnitude}"),
        }
    };
    format!("{sign}{body}")
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Invocation> for Value {
    fn from(invocation: Invocation) -> Self {
        Value::Template(invocation)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

impl From<Stream> for Value {
    fn from(stream: Stream) -> Self {
        Value::Stream(stream)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Listener> for Value {
    fn from(listener: Listener) -> Self {
        Value::Listener(listener)
    }
}

#[cfg(test)]
#[path = "tests/value_tests.rs"]
mod tests;
