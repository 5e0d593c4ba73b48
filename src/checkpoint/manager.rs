//! The per-run checkpoint and progress manager.
//!
//! One `CheckpointManager` exists per workflow invocation. It is the single
//! place that assigns event ids, timestamps events, forwards them to sinks,
//! builds the checkpoint tree, and applies secret redaction. The node table,
//! the id counter, and the sinks live behind one mutex, locked per event, so
//! concurrently resolving branches observe a single total event order.
//!
//! Sink failures are logged and dropped; observability is best-effort and
//! must never abort the execution path.

use chrono::Utc;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use uuid::Uuid;

use super::node::{CheckpointNode, NodeId, NodeSnapshot, NodeState};
use super::secrets;
use crate::component::ComponentOpts;
use crate::error::ErrorDetail;
use crate::progress::event::{ProgressEvent, ProgressEventKind};
use crate::progress::sink::ProgressSink;

/// Output recorded for a component whose result was handed on as a live
/// stream; back-filled with the collected text when the consumer exhausts it.
pub const STREAMING_PLACEHOLDER: &str = "__trellis_stream_pending__";

struct ManagerState {
    nodes: FxHashMap<NodeId, CheckpointNode>,
    root: Option<NodeId>,
    secrets: FxHashMap<NodeId, Vec<String>>,
    sinks: Vec<Box<dyn ProgressSink>>,
    next_event_id: u64,
    workflow_name: Option<String>,
    finished: bool,
}

/// Cross-cutting observer attached to one execution.
pub struct CheckpointManager {
    state: Mutex<ManagerState>,
    enabled: bool,
}

impl CheckpointManager {
    /// Create a manager. A disabled manager records nothing and emits
    /// nothing; execution semantics are unaffected.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                nodes: FxHashMap::default(),
                root: None,
                secrets: FxHashMap::default(),
                sinks: Vec::new(),
                next_event_id: 1,
                workflow_name: None,
                finished: false,
            }),
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Register an additional delivery target for progress events.
    pub fn add_sink(&self, sink: Box<dyn ProgressSink>) {
        self.state.lock().sinks.push(sink);
    }

    /// Record the workflow name and emit the `start` event.
    pub fn start(&self, workflow_name: &str) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        state.workflow_name = Some(workflow_name.to_string());
        Self::emit(
            &mut state,
            ProgressEventKind::Start {
                workflow_name: workflow_name.to_string(),
            },
        );
    }

    /// Emit the `end` event. Idempotent: later calls are no-ops.
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        if state.finished {
            return;
        }
        state.finished = true;
        Self::emit(&mut state, ProgressEventKind::End);
    }

    /// Create a `Running` checkpoint node and emit `component-start`.
    ///
    /// Prop-path secrets declared in `opts` are registered before the props
    /// snapshot is redacted and stored.
    pub(crate) fn add_node(
        &self,
        component_name: &str,
        opts: &ComponentOpts,
        props: Value,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = Uuid::new_v4();
        if !self.enabled {
            return id;
        }
        let mut state = self.state.lock();

        let mut own_secrets = Vec::new();
        for path in &opts.secret_props {
            if let Some(value) = secrets::value_at_path(&props, path) {
                secrets::collect_secret_values(value, &mut own_secrets);
            }
        }
        if !own_secrets.is_empty() {
            state.secrets.insert(id, own_secrets);
        }

        let effective = Self::effective_secrets(&state, Some(id), parent);
        let redacted_props = secrets::scrub_value(&props, &effective);

        let mut node = CheckpointNode::new(
            id,
            component_name.to_string(),
            redacted_props.clone(),
            parent,
            opts.clone(),
        );
        if !opts.metadata.is_empty() {
            node.metadata = secrets::scrub_value(&Value::Object(opts.metadata.clone()), &effective)
                .as_object()
                .cloned()
                .unwrap_or_default();
        }

        if let Some(parent_id) = parent {
            if let Some(parent_node) = state.nodes.get_mut(&parent_id) {
                parent_node.children.push(id);
            } else {
                tracing::warn!(node = %id, parent = %parent_id, "checkpoint parent not found");
            }
        }
        state.nodes.insert(id, node);
        if state.root.is_none() && parent.is_none() {
            state.root = Some(id);
        }

        Self::emit(
            &mut state,
            ProgressEventKind::ComponentStart {
                component_name: component_name.to_string(),
                node_id: id.to_string(),
                props: Some(redacted_props),
            },
        );
        id
    }

    /// Finalize a node as `Completed` and emit `component-end`.
    pub(crate) fn complete_node(&self, id: NodeId, output: Value) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get(&id) else {
            tracing::warn!(node = %id, "attempted to complete unknown checkpoint node");
            return;
        };
        let component_name = node.component_name.clone();
        let parent = node.parent;
        let secret_outputs = node.opts.secret_outputs;

        if secret_outputs && output != Value::String(STREAMING_PLACEHOLDER.to_string()) {
            let own = state.secrets.entry(id).or_default();
            secrets::collect_secret_values(&output, own);
        }
        let effective = Self::effective_secrets(&state, Some(id), parent);
        let redacted = secrets::scrub_value(&output, &effective);

        if let Some(node) = state.nodes.get_mut(&id) {
            node.state = NodeState::Completed;
            node.end_time = Some(Utc::now());
            node.output = Some(redacted.clone());
        }
        Self::emit(
            &mut state,
            ProgressEventKind::ComponentEnd {
                component_name,
                node_id: id.to_string(),
                output: Some(redacted),
            },
        );
    }

    /// Finalize a node whose output is a live stream: `component-end` is
    /// emitted now with [`STREAMING_PLACEHOLDER`] so causal ordering holds,
    /// and the real text is back-filled on exhaustion.
    pub(crate) fn complete_streaming_node(&self, id: NodeId) {
        self.complete_node(id, Value::String(STREAMING_PLACEHOLDER.to_string()));
    }

    /// Back-fill the collected text of an exhausted stream. No event.
    pub(crate) fn update_output(&self, id: NodeId, output: Value) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get(&id) else {
            return;
        };
        let parent = node.parent;
        let secret_outputs = node.opts.secret_outputs;
        if secret_outputs {
            let own = state.secrets.entry(id).or_default();
            secrets::collect_secret_values(&output, own);
        }
        let effective = Self::effective_secrets(&state, Some(id), parent);
        let redacted = secrets::scrub_value(&output, &effective);
        if let Some(node) = state.nodes.get_mut(&id) {
            node.output = Some(redacted);
        }
    }

    /// Mark a node `Failed` and emit the `error` terminal event.
    ///
    /// Called at every component boundary a failure propagates past, so each
    /// ancestor records the error with its own node id.
    pub(crate) fn fail_node(&self, id: NodeId, detail: ErrorDetail) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get_mut(&id) else {
            tracing::warn!(node = %id, "attempted to fail unknown checkpoint node");
            return;
        };
        node.state = NodeState::Failed;
        if node.end_time.is_none() {
            node.end_time = Some(Utc::now());
        }
        node.error = Some(detail.clone());
        let component_name = node.component_name.clone();
        Self::emit(
            &mut state,
            ProgressEventKind::Error {
                node_id: Some(id.to_string()),
                component_name: Some(component_name),
                error: detail,
            },
        );
    }

    /// Merge metadata into a node. Silent (no event).
    pub(crate) fn add_metadata(&self, id: NodeId, metadata: serde_json::Map<String, Value>) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get(&id) else {
            return;
        };
        let parent = node.parent;
        let effective = Self::effective_secrets(&state, Some(id), parent);
        let scrubbed = secrets::scrub_value(&Value::Object(metadata), &effective);
        if let (Some(node), Value::Object(map)) = (state.nodes.get_mut(&id), scrubbed) {
            for (k, v) in map {
                node.metadata.insert(k, v);
            }
        }
    }

    /// Metadata merge onto the root node (workflow-level metadata).
    pub(crate) fn add_root_metadata(&self, metadata: serde_json::Map<String, Value>) {
        let root = self.state.lock().root;
        if let Some(root) = root {
            self.add_metadata(root, metadata);
        }
    }

    /// Emit a `progress` event with an arbitrary payload, redacted with the
    /// emitting node's effective secrets.
    pub(crate) fn progress(&self, node: Option<NodeId>, data: Value) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock();
        let parent = node.and_then(|id| state.nodes.get(&id)).and_then(|n| n.parent);
        let effective = Self::effective_secrets(&state, node, parent);
        let data = secrets::scrub_value(&data, &effective);
        Self::emit(
            &mut state,
            ProgressEventKind::Progress {
                node_id: node.map(|id| id.to_string()),
                data,
            },
        );
    }

    /// Serializable view of the whole execution tree, or `None` before the
    /// root component started (or when disabled).
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        let state = self.state.lock();
        let root = state.root?;
        Some(Self::snapshot_node(&state, root))
    }

    /// Number of invocations recorded so far.
    pub fn step_count(&self) -> usize {
        let state = self.state.lock();
        state.nodes.len()
    }

    pub fn workflow_name(&self) -> Option<String> {
        self.state.lock().workflow_name.clone()
    }

    fn snapshot_node(state: &ManagerState, id: NodeId) -> NodeSnapshot {
        let node = &state.nodes[&id];
        NodeSnapshot {
            id: node.id.to_string(),
            component_name: node.component_name.clone(),
            state: node.state,
            start_time: node.start_time.timestamp_millis(),
            end_time: node.end_time.map(|t| t.timestamp_millis()),
            props: node.props.clone(),
            output: node.output.clone(),
            metadata: node.metadata.clone(),
            error: node.error.clone(),
            parent_id: node.parent.map(|p| p.to_string()),
            children: node
                .children
                .iter()
                .map(|child| Self::snapshot_node(state, *child))
                .collect(),
        }
    }

    /// Secrets effective at `node`: its own plus every ancestor's.
    fn effective_secrets(
        state: &ManagerState,
        node: Option<NodeId>,
        mut parent: Option<NodeId>,
    ) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        let mut visit = |id: NodeId, all: &mut Vec<String>| {
            if let Some(own) = state.secrets.get(&id) {
                for s in own {
                    if !all.iter().any(|known| known == s) {
                        all.push(s.clone());
                    }
                }
            }
        };
        if let Some(id) = node {
            visit(id, &mut all);
        }
        while let Some(id) = parent {
            visit(id, &mut all);
            parent = state.nodes.get(&id).and_then(|n| n.parent);
        }
        secrets::sort_for_scrub(&mut all);
        all
    }

    /// Assign the next event id, stamp the timestamp, and deliver to every
    /// sink. Sink errors are logged and dropped.
    fn emit(state: &mut ManagerState, kind: ProgressEventKind) {
        let id = state.next_event_id;
        state.next_event_id += 1;
        let event = ProgressEvent {
            id: id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            kind,
        };
        for sink in state.sinks.iter_mut() {
            if let Err(err) = sink.handle(&event) {
                tracing::warn!(event = %event, error = %err, "progress sink failed");
            }
        }
    }
}
