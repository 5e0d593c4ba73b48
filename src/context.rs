//! Ambient context propagation without prop threading.
//!
//! A [`Context`] is a typed key with a default value. A Provider element
//! extends an immutable parent-chain of bindings for the duration of its
//! children subtree; lookup walks from the nearest link to the root and falls
//! back to the default. Because every Provider allocates a fresh link and
//! never mutates an existing one, sibling subtrees resolved concurrently with
//! different Provider values cannot interfere, the chief concurrency-safety
//! property of the engine.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::{Element, ProviderCall};

static NEXT_CONTEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// A typed ambient-context key with a process-unique identity and a default
/// value returned verbatim when no Provider is in scope.
pub struct Context<T> {
    key: u64,
    label: String,
    default: T,
}

impl<T: Clone + Send + Sync + 'static> Context<T> {
    pub fn new(default: T) -> Self {
        Self::named("Context", default)
    }

    /// Create a context with a label used in debug output.
    pub fn named(label: impl Into<String>, default: T) -> Self {
        Self {
            key: NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            default,
        }
    }

    /// Build a Provider element: `value` is visible to every descendant of
    /// `children` unless shadowed by a nearer Provider of the same context.
    pub fn provider(&self, value: T, children: Element) -> Element {
        Element::Provider(ProviderCall {
            key: self.key,
            label: self.label.clone(),
            value: Arc::new(value),
            children: Box::new(children),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn key(&self) -> u64 {
        self.key
    }

    pub(crate) fn default(&self) -> &T {
        &self.default
    }
}

impl<T> std::fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("label", &self.label)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// One immutable link in the ambient binding chain.
///
/// Links are shared via `Arc` and freed naturally when the subtree resolution
/// that created them completes.
pub(crate) struct ContextBindings {
    key: u64,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<ContextBindings>>,
}

impl ContextBindings {
    pub(crate) fn extend(
        parent: Option<Arc<ContextBindings>>,
        key: u64,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Arc<Self> {
        Arc::new(Self { key, value, parent })
    }

    /// Nearest-to-root lookup, O(depth).
    pub(crate) fn lookup(self: &Arc<Self>, key: u64) -> Option<&Arc<dyn Any + Send + Sync>> {
        let mut current = self;
        loop {
            if current.key == key {
                return Some(&current.value);
            }
            match &current.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }
}
