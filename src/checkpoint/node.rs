//! Checkpoint nodes: recorded invocation metadata mirroring the live
//! execution tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::component::ComponentOpts;
use crate::error::ErrorDetail;

/// Identifier of one recorded component invocation.
pub type NodeId = Uuid;

/// Per-invocation lifecycle state.
///
/// A node is created `Running` at component-start and finalized to
/// `Completed` or `Failed` exactly once. No retries occur at this layer; it
/// is purely observational.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Live (mutable) checkpoint record, owned by the manager.
#[derive(Debug)]
pub(crate) struct CheckpointNode {
    pub id: NodeId,
    pub component_name: String,
    pub state: NodeState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Redacted at insertion time.
    pub props: Value,
    /// Redacted at completion time.
    pub output: Option<Value>,
    pub metadata: serde_json::Map<String, Value>,
    pub error: Option<ErrorDetail>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub opts: ComponentOpts,
}

impl CheckpointNode {
    pub(crate) fn new(
        id: NodeId,
        component_name: String,
        props: Value,
        parent: Option<NodeId>,
        opts: ComponentOpts,
    ) -> Self {
        Self {
            id,
            component_name,
            state: NodeState::Running,
            start_time: Utc::now(),
            end_time: None,
            props,
            output: None,
            metadata: serde_json::Map::new(),
            error: None,
            parent,
            children: Vec::new(),
            opts,
        }
    }
}

/// Immutable, serializable view of a checkpoint subtree.
///
/// Timestamps are milliseconds since the Unix epoch; field names follow the
/// wire convention of the progress events (camelCase).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    pub component_name: String,
    pub state: NodeState,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub props: Value,
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub parent_id: Option<String>,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Total number of invocations recorded in this subtree.
    pub fn step_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::step_count).sum::<usize>()
    }

    /// Depth-first search by component name.
    pub fn find(&self, component_name: &str) -> Option<&NodeSnapshot> {
        if self.component_name == component_name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(component_name))
    }
}
