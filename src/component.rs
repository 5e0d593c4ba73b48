//! Component factory: named, introspectable wrappers around async bodies.
//!
//! A [`Component`] carries no execution state of its own. Construction via
//! [`Component::call`] is purely descriptive: the body runs only when the
//! resolver visits the resulting element, or through the direct
//! [`Component::run`] form.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::element::{ComponentCall, Element, Props};
use crate::error::{ComponentError, ResolveError};
use crate::scope::ComponentScope;

/// Name assigned to components declared with an empty name, keeping
/// observability labels stable and non-empty.
pub const ANONYMOUS_COMPONENT: &str = "Anonymous";

/// Whether a component produces a final value or a chunk stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// Body output resolves to a final value.
    Standard,
    /// Body output is expected to resolve to a [`Streamable`](crate::streaming::Streamable).
    Stream,
}

/// Per-component configuration applied by the checkpoint manager.
#[derive(Clone, Debug, Default)]
pub struct ComponentOpts {
    /// Dot-separated prop paths whose string values are registered as secrets
    /// and scrubbed from checkpoints and progress events.
    pub secret_props: Vec<String>,
    /// Register the component's output values as secrets.
    pub secret_outputs: bool,
    /// Static metadata attached to the component's checkpoint node.
    pub metadata: serde_json::Map<String, Value>,
}

type BodyFn = dyn Fn(Props, ComponentScope) -> BoxFuture<'static, Result<Element, ComponentError>>
    + Send
    + Sync;

/// A named wrapper around an async body, invocable directly or embeddable in
/// an element tree.
///
/// Cloning a `Component` is cheap (the body is shared); each embedded
/// [`Element::Call`] still resolves at most once.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    kind: ComponentKind,
    opts: Arc<ComponentOpts>,
    body: Arc<BodyFn>,
}

impl Component {
    /// Declare a standard component.
    ///
    /// An empty `name` falls back to [`ANONYMOUS_COMPONENT`].
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Props, ComponentScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Element, ComponentError>> + Send + 'static,
    {
        Self::build(name, ComponentKind::Standard, ComponentOpts::default(), body)
    }

    /// Declare a stream component: its resolved output is expected to be a
    /// chunk stream, kept live when the workflow runs in stream mode.
    pub fn stream<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Props, ComponentScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Element, ComponentError>> + Send + 'static,
    {
        Self::build(name, ComponentKind::Stream, ComponentOpts::default(), body)
    }

    /// Declare a standard component with explicit [`ComponentOpts`].
    pub fn with_opts<F, Fut>(name: impl Into<String>, opts: ComponentOpts, body: F) -> Self
    where
        F: Fn(Props, ComponentScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Element, ComponentError>> + Send + 'static,
    {
        Self::build(name, ComponentKind::Standard, opts, body)
    }

    fn build<F, Fut>(name: impl Into<String>, kind: ComponentKind, opts: ComponentOpts, body: F) -> Self
    where
        F: Fn(Props, ComponentScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Element, ComponentError>> + Send + 'static,
    {
        let name = name.into();
        let name = if name.is_empty() {
            ANONYMOUS_COMPONENT.to_string()
        } else {
            name
        };
        Self {
            name: Arc::from(name.as_str()),
            kind,
            opts: Arc::new(opts),
            body: Arc::new(move |props, scope| body(props, scope).boxed()),
        }
    }

    /// The component's stable observability name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn opts(&self) -> &ComponentOpts {
        &self.opts
    }

    /// Construction form: describe an invocation without executing anything.
    pub fn call(&self, props: Props) -> Element {
        Element::Call(ComponentCall {
            component: self.clone(),
            props,
            children: None,
        })
    }

    /// Construction form with a children continuation: the body's fully
    /// resolved output is fed to `children_fn`, and the continuation's
    /// resolved result becomes the effective output of this invocation.
    pub fn call_with_children<F>(&self, props: Props, children_fn: F) -> Element
    where
        F: FnOnce(Value) -> Element + Send + 'static,
    {
        Element::Call(ComponentCall {
            component: self.clone(),
            props,
            children: Some(Box::new(children_fn)),
        })
    }

    /// Direct invocation: run this component under an ad-hoc execution
    /// context and return its fully materialized output.
    ///
    /// Checkpointing and progress events still fire; the ad-hoc context just
    /// has no registered sinks unless configured globally.
    pub async fn run(&self, props: Props) -> Result<Value, ResolveError> {
        crate::resolver::execute(self.call(props)).await
    }

    pub(crate) fn invoke(
        &self,
        props: Props,
        scope: ComponentScope,
    ) -> BoxFuture<'static, Result<Element, ComponentError>> {
        (self.body)(props, scope)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
