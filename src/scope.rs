//! Execution scope: the ambient handle component bodies receive.
//!
//! [`WorkflowExecutionContext`] is the per-invocation singleton bundling the
//! checkpoint manager and run identity, owned exclusively by one run so
//! concurrent invocations of the same workflow never cross-talk.
//! [`ComponentScope`] is the cheap clone of that plus the context-bindings
//! chain and the current checkpoint node, threaded through the resolver.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::checkpoint::{CheckpointManager, NodeId};
use crate::config::TrellisConfig;
use crate::context::{Context, ContextBindings};

/// Per-run execution context: one per top-level workflow invocation (or
/// ad-hoc `execute`/`run` call).
pub struct WorkflowExecutionContext {
    run_id: Uuid,
    manager: CheckpointManager,
}

impl WorkflowExecutionContext {
    pub(crate) fn new(manager: CheckpointManager) -> Arc<Self> {
        Arc::new(Self {
            run_id: Uuid::new_v4(),
            manager,
        })
    }

    /// Ad-hoc context for direct execution outside a named workflow:
    /// checkpointing per global config, no sinks registered.
    pub(crate) fn detached() -> Arc<Self> {
        let config = TrellisConfig::from_env();
        Self::new(CheckpointManager::new(config.checkpoints_enabled))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn manager(&self) -> &CheckpointManager {
        &self.manager
    }
}

/// Ambient handle passed to component bodies and threaded through the
/// resolver.
#[derive(Clone)]
pub struct ComponentScope {
    pub(crate) run: Arc<WorkflowExecutionContext>,
    pub(crate) bindings: Option<Arc<ContextBindings>>,
    pub(crate) node: Option<NodeId>,
}

impl ComponentScope {
    pub(crate) fn root(run: Arc<WorkflowExecutionContext>) -> Self {
        Self {
            run,
            bindings: None,
            node: None,
        }
    }

    /// Nearest-ancestor context lookup; returns the declared default
    /// verbatim when no Provider is in scope.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, context: &Context<T>) -> T {
        if let Some(bindings) = &self.bindings {
            if let Some(value) = bindings.lookup(context.key()) {
                if let Some(typed) = value.downcast_ref::<T>() {
                    return typed.clone();
                }
                tracing::warn!(
                    context = context.label(),
                    "context binding had unexpected type; falling back to default"
                );
            }
        }
        context.default().clone()
    }

    /// Emit a `progress` event carrying an arbitrary JSON payload, attached
    /// to the current component invocation. Delivery is best-effort.
    pub fn progress(&self, data: Value) {
        self.run.manager().progress(self.node, data);
    }

    /// Identifier of this run's execution context.
    pub fn run_id(&self) -> Uuid {
        self.run.run_id()
    }

    pub(crate) fn child(&self, node: NodeId) -> Self {
        Self {
            run: Arc::clone(&self.run),
            bindings: self.bindings.clone(),
            node: Some(node),
        }
    }

    pub(crate) fn with_bindings(&self, bindings: Arc<ContextBindings>) -> Self {
        Self {
            run: Arc::clone(&self.run),
            bindings: Some(bindings),
            node: self.node,
        }
    }
}
