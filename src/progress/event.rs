//! Ordered, identified lifecycle events emitted during execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorDetail;

/// One progress event: a per-run strictly increasing id, an emission
/// timestamp, and a tagged payload.
///
/// Wire shape (JSON): `{"id": "3", "timestamp": 1724900000000,
/// "type": "component-start", ...type-specific camelCase fields}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    /// Strictly increasing integer within one run, rendered as a string.
    pub id: String,
    /// Milliseconds since the Unix epoch, stamped at emission.
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: ProgressEventKind,
}

/// The tagged union of lifecycle notifications.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProgressEventKind {
    /// Workflow execution began.
    #[serde(rename_all = "camelCase")]
    Start { workflow_name: String },

    /// A component invocation began; props are already redacted.
    #[serde(rename_all = "camelCase")]
    ComponentStart {
        component_name: String,
        node_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<Value>,
    },

    /// A component invocation finished; output is already redacted.
    #[serde(rename_all = "camelCase")]
    ComponentEnd {
        component_name: String,
        node_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },

    /// Arbitrary JSON-serializable payload reported by a component body.
    #[serde(rename_all = "camelCase")]
    Progress {
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        data: Value,
    },

    /// A component boundary observed a propagating failure.
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        component_name: Option<String>,
        error: ErrorDetail,
    },

    /// Workflow execution ended (successfully or not).
    End,
}

impl ProgressEventKind {
    /// The wire tag for this event kind.
    pub fn label(&self) -> &'static str {
        match self {
            ProgressEventKind::Start { .. } => "start",
            ProgressEventKind::ComponentStart { .. } => "component-start",
            ProgressEventKind::ComponentEnd { .. } => "component-end",
            ProgressEventKind::Progress { .. } => "progress",
            ProgressEventKind::Error { .. } => "error",
            ProgressEventKind::End => "end",
        }
    }

    /// True for the events that terminate a component invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEventKind::ComponentEnd { .. } | ProgressEventKind::Error { .. }
        )
    }

    /// Component name carried by this event, when any.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            ProgressEventKind::ComponentStart { component_name, .. }
            | ProgressEventKind::ComponentEnd { component_name, .. } => Some(component_name),
            ProgressEventKind::Error { component_name, .. } => component_name.as_deref(),
            _ => None,
        }
    }
}

impl ProgressEvent {
    /// Structured JSON value in the documented wire shape.
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Compact JSON string in the documented wire shape.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ProgressEventKind::Start { workflow_name } => {
                write!(f, "[{}] start {workflow_name}", self.id)
            }
            ProgressEventKind::ComponentStart { component_name, .. } => {
                write!(f, "[{}] component-start {component_name}", self.id)
            }
            ProgressEventKind::ComponentEnd { component_name, .. } => {
                write!(f, "[{}] component-end {component_name}", self.id)
            }
            ProgressEventKind::Progress { data, .. } => {
                write!(f, "[{}] progress {data}", self.id)
            }
            ProgressEventKind::Error { error, .. } => {
                write!(f, "[{}] error {}", self.id, error.message)
            }
            ProgressEventKind::End => write!(f, "[{}] end", self.id),
        }
    }
}
