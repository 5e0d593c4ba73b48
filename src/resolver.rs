//! The resolver: turns an element tree into its fully resolved form.
//!
//! Resolution is structural recursion with structured concurrency at the
//! fan-out points: lists and objects schedule every entry concurrently and
//! reassemble results in their original positional/keyed order regardless of
//! completion order. The first failure in a group wins; dropping the join
//! future drops still-pending siblings with it.
//!
//! Component boundaries are where observability happens: each visited call
//! creates a checkpoint node, emits `component-start`, and finalizes the node
//! with the resolved output or the propagating error. Live chunk streams are
//! preserved as handles through tail positions and drained only where the
//! consuming position demands a materialized value.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, try_join_all};
use serde_json::Value;
use std::sync::Arc;

use crate::checkpoint::NodeId;
use crate::context::ContextBindings;
use crate::element::{ComponentCall, Element};
use crate::error::{ErrorDetail, ResolveError};
use crate::scope::{ComponentScope, WorkflowExecutionContext};
use crate::streaming::Streamable;

/// Outcome of resolving one element: a final value, or a still-live stream.
pub(crate) enum Resolved {
    Value(Value),
    Stream(Streamable),
}

/// Resolve an element under an ad-hoc execution context, outside any named
/// workflow. Streams are drained: the result is always a final value.
pub async fn execute(element: Element) -> Result<Value, ResolveError> {
    let scope = ComponentScope::root(WorkflowExecutionContext::detached());
    let resolved = resolve(element, scope).await?;
    materialize(resolved).await
}

/// Recursively resolve `element` in `scope`.
///
/// Boxed for recursion; every intermediate future is `Send` so fan-out works
/// on multi-threaded runtimes.
pub(crate) fn resolve(
    element: Element,
    scope: ComponentScope,
) -> BoxFuture<'static, Result<Resolved, ResolveError>> {
    async move {
        match element {
            Element::Value(value) => Ok(Resolved::Value(value)),

            Element::Stream(stream) => Ok(Resolved::Stream(stream)),

            Element::Future(fut) => {
                let next = fut.await.map_err(|source| ResolveError::Deferred { source })?;
                resolve(next, scope).await
            }

            Element::List(items) => {
                let futures = items.into_iter().map(|item| {
                    let scope = scope.clone();
                    async move { resolve_value(item, scope).await }
                });
                let values = try_join_all(futures).await?;
                Ok(Resolved::Value(Value::Array(values)))
            }

            Element::Object(entries) => {
                let (keys, elements): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
                let futures = elements.into_iter().map(|item| {
                    let scope = scope.clone();
                    async move { resolve_value(item, scope).await }
                });
                let values = try_join_all(futures).await?;
                let mut map = serde_json::Map::with_capacity(keys.len());
                for (key, value) in keys.into_iter().zip(values) {
                    map.insert(key, value);
                }
                Ok(Resolved::Value(Value::Object(map)))
            }

            Element::Provider(provider) => {
                let bindings = ContextBindings::extend(
                    scope.bindings.clone(),
                    provider.key,
                    provider.value,
                );
                resolve(*provider.children, scope.with_bindings(bindings)).await
            }

            Element::Call(call) => resolve_call(call, scope).await,
        }
    }
    .boxed()
}

/// Resolve to a materialized value, draining a live stream if one surfaces.
pub(crate) async fn resolve_value(
    element: Element,
    scope: ComponentScope,
) -> Result<Value, ResolveError> {
    let resolved = resolve(element, scope).await?;
    materialize(resolved).await
}

pub(crate) async fn materialize(resolved: Resolved) -> Result<Value, ResolveError> {
    match resolved {
        Resolved::Value(value) => Ok(value),
        Resolved::Stream(stream) => Ok(Value::String(
            stream.collect_text().await.map_err(ResolveError::Stream)?,
        )),
    }
}

async fn resolve_call(call: ComponentCall, scope: ComponentScope) -> Result<Resolved, ResolveError> {
    let ComponentCall {
        component,
        props,
        children,
    } = call;
    let manager = scope.run.manager();
    let node_id = manager.add_node(
        component.name(),
        component.opts(),
        props.to_value(),
        scope.node,
    );
    let child_scope = scope.child(node_id);

    let body_output = match component.invoke(props, child_scope.clone()).await {
        Ok(element) => element,
        Err(source) => {
            let err = ResolveError::Component {
                component: component.name().to_string(),
                source,
            };
            scope.run.manager().fail_node(node_id, ErrorDetail::from(&err));
            return Err(err);
        }
    };

    let resolved = match resolve(body_output, child_scope.clone()).await {
        Ok(resolved) => resolved,
        Err(err) => {
            scope.run.manager().fail_node(node_id, ErrorDetail::from(&err));
            return Err(err);
        }
    };

    // Children-as-continuation takes precedence over the direct output: the
    // resolved body output is the continuation's input, and the
    // continuation's resolved result is the effective output.
    let resolved = match children {
        None => resolved,
        Some(children_fn) => {
            let input = match materialize(resolved).await {
                Ok(value) => value,
                Err(err) => {
                    scope.run.manager().fail_node(node_id, ErrorDetail::from(&err));
                    return Err(err);
                }
            };
            match resolve(children_fn(input), child_scope.clone()).await {
                Ok(resolved) => resolved,
                Err(err) => {
                    scope.run.manager().fail_node(node_id, ErrorDetail::from(&err));
                    return Err(err);
                }
            }
        }
    };

    match resolved {
        Resolved::Value(value) => {
            scope.run.manager().complete_node(node_id, value.clone());
            Ok(Resolved::Value(value))
        }
        Resolved::Stream(stream) => {
            // The node is finalized now, with a placeholder output, so the
            // parent's terminal event cannot precede this one; the collected
            // text is back-filled once the consumer exhausts the handle.
            scope.run.manager().complete_streaming_node(node_id);
            let observed = observe_stream(stream, Arc::clone(&scope.run), node_id);
            Ok(Resolved::Stream(observed))
        }
    }
}

/// Tee a live stream so the checkpoint node learns its collected text (or
/// terminal error) when the consumer finishes with it.
fn observe_stream(
    stream: Streamable,
    run: Arc<WorkflowExecutionContext>,
    node_id: NodeId,
) -> Streamable {
    struct ObserveState {
        inner: Streamable,
        run: Arc<WorkflowExecutionContext>,
        node_id: NodeId,
        buffer: String,
        done: bool,
    }

    let state = ObserveState {
        inner: stream,
        run,
        node_id,
        buffer: String::new(),
        done: false,
    };

    Streamable::from_stream(futures_util::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        match state.inner.next_chunk().await {
            Some(Ok(chunk)) => {
                state.buffer.push_str(&chunk);
                Some((Ok(chunk), state))
            }
            Some(Err(err)) => {
                state.done = true;
                state
                    .run
                    .manager()
                    .fail_node(state.node_id, ErrorDetail::from(&err));
                Some((Err(err), state))
            }
            None => {
                state.run.manager().update_output(
                    state.node_id,
                    Value::String(std::mem::take(&mut state.buffer)),
                );
                None
            }
        }
    }))
}
