//! The element model: an immutable tree of deferred component invocations.
//!
//! An [`Element`] describes *what* to run without running anything; execution
//! happens only when the resolver visits it. Elements are consumed by value
//! and are deliberately not `Clone`: every element is resolved at most once,
//! enforced by ownership rather than by a memo table.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use crate::component::Component;
use crate::error::ComponentError;
use crate::streaming::Streamable;

/// Continuation applied to a component's fully resolved output to build more
/// tree. Called at most once.
pub type ChildrenFn = Box<dyn FnOnce(Value) -> Element + Send>;

/// Deferred element produced by an async producer outside the component model.
pub type ElementFuture = BoxFuture<'static, Result<Element, ComponentError>>;

/// An immutable description of work for the resolver.
///
/// Built via plain constructors and `From` conversions; no markup syntax is
/// involved, only the tree-of-deferred-calls semantics.
pub enum Element {
    /// A plain JSON leaf value; passes through resolution unchanged.
    Value(Value),
    /// Items resolved concurrently; results keep positional order.
    List(Vec<Element>),
    /// Keyed entries resolved concurrently; results keep key correspondence.
    Object(Vec<(String, Element)>),
    /// A deferred component invocation.
    Call(ComponentCall),
    /// A context provider scoping one binding to its children subtree.
    Provider(ProviderCall),
    /// A live chunk stream.
    Stream(Streamable),
    /// A deferred element: awaited, then resolved recursively.
    Future(ElementFuture),
}

impl Element {
    /// Leaf value from anything JSON-convertible.
    pub fn value(value: impl Into<Value>) -> Self {
        Element::Value(value.into())
    }

    /// Parallel fan-out over a list of elements.
    pub fn list(items: impl IntoIterator<Item = Element>) -> Self {
        Element::List(items.into_iter().collect())
    }

    /// Parallel fan-out over keyed elements.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Element)>) -> Self {
        Element::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Defer to an async producer of elements.
    pub fn future<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = Result<Element, ComponentError>> + Send + 'static,
    {
        Element::Future(fut.boxed())
    }

    /// Wrap a live chunk stream.
    pub fn stream(stream: Streamable) -> Self {
        Element::Stream(stream)
    }

    /// Label used in traces and debug output.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Element::Value(_) => "value",
            Element::List(_) => "list",
            Element::Object(_) => "object",
            Element::Call(_) => "call",
            Element::Provider(_) => "provider",
            Element::Stream(_) => "stream",
            Element::Future(_) => "future",
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Element::List(items) => f.debug_tuple("List").field(&items.len()).finish(),
            Element::Object(entries) => f.debug_tuple("Object").field(&entries.len()).finish(),
            Element::Call(call) => f.debug_tuple("Call").field(&call.component.name()).finish(),
            Element::Provider(p) => f.debug_tuple("Provider").field(&p.label).finish(),
            Element::Stream(_) => f.write_str("Stream(..)"),
            Element::Future(_) => f.write_str("Future(..)"),
        }
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::Value(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Value(Value::String(value))
    }
}

impl From<Vec<Element>> for Element {
    fn from(items: Vec<Element>) -> Self {
        Element::List(items)
    }
}

impl From<Streamable> for Element {
    fn from(stream: Streamable) -> Self {
        Element::Stream(stream)
    }
}

/// A deferred invocation: component + props + optional children continuation.
pub struct ComponentCall {
    pub(crate) component: Component,
    pub(crate) props: Props,
    pub(crate) children: Option<ChildrenFn>,
}

/// A context binding scoped to a children subtree.
///
/// The binding is type-erased here; [`Context`](crate::context::Context)
/// recovers the concrete type on lookup.
pub struct ProviderCall {
    pub(crate) key: u64,
    pub(crate) label: String,
    pub(crate) value: Arc<dyn Any + Send + Sync>,
    pub(crate) children: Box<Element>,
}

/// Named inputs for a component invocation.
///
/// A thin wrapper over a JSON-valued map with a builder and typed getters,
/// snapshotted (after redaction) into the checkpoint node at invocation time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: FxHashMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.entries.get(key).and_then(Value::as_u64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.get(key).and_then(Value::as_bool)
    }

    /// Fetch a required prop, failing with
    /// [`ComponentError::MissingInput`] when absent.
    pub fn require(&self, key: &str) -> Result<&Value, ComponentError> {
        self.entries.get(key).ok_or(ComponentError::MissingInput {
            what: key.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Snapshot as a JSON object (used for checkpointing and events).
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}
