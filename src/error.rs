//! Error taxonomy for the trellis execution engine.
//!
//! Three layers mirror the execution model: [`ComponentError`] is what a
//! component body can fail with, [`ResolveError`] is a body failure wrapped
//! with the originating component's identity (plus resolver-level failures),
//! and [`WorkflowError`] tags the failure with the workflow that was running.
//! Observability carries errors as the serializable [`ErrorDetail`].

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a component body can return.
///
/// Bodies fail with a `ComponentError`; the resolver wraps it into
/// [`ResolveError::Component`] together with the component's declared name,
/// so the failure can be attributed in checkpoints and progress events.
#[derive(Debug, Error, Diagnostic)]
pub enum ComponentError {
    /// Input validation failed. Fatal to the enclosing resolution.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(trellis::component::validation),
        help("Check prop values and required fields.")
    )]
    Validation(String),

    /// An expected prop or context value is missing.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(trellis::component::missing_input),
        help("Check that the caller supplied the required prop.")
    )]
    MissingInput { what: String },

    /// External provider or service error (LLM call, tool call, ...).
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(trellis::component::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(trellis::component::serde_json))]
    Serde(#[from] serde_json::Error),

    /// A chunk stream consumed inside the body failed.
    #[error(transparent)]
    #[diagnostic(code(trellis::component::stream))]
    Stream(#[from] StreamError),

    /// Free-form failure message.
    #[error("{0}")]
    #[diagnostic(code(trellis::component::other))]
    Msg(String),
}

impl ComponentError {
    /// Shorthand for a free-form error message.
    pub fn msg(message: impl Into<String>) -> Self {
        ComponentError::Msg(message.into())
    }
}

/// Errors raised by a [`Streamable`](crate::streaming::Streamable) producer.
///
/// A mid-stream error terminates the chunk sequence; chunks already delivered
/// are not retracted.
#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    /// The producer reported a failure.
    #[error("stream producer error: {0}")]
    #[diagnostic(code(trellis::stream::producer))]
    Producer(String),

    /// The producer side was dropped before signalling completion.
    #[error("stream disconnected before completion")]
    #[diagnostic(
        code(trellis::stream::disconnected),
        help("The consumer was dropped or the producer task ended early.")
    )]
    Disconnected,
}

/// Errors surfaced by [`resolve`](crate::resolver)/[`execute`](crate::resolver::execute).
///
/// The first failure in a parallel fan-out group wins; still-pending siblings
/// in the group are dropped when the group's join future is dropped.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A component body failed. Carries the originating component's name.
    #[error("component '{component}' failed: {source}")]
    #[diagnostic(code(trellis::resolver::component))]
    Component {
        component: String,
        #[source]
        source: ComponentError,
    },

    /// A deferred element (`Element::Future`) failed before resolution.
    #[error("deferred element failed: {source}")]
    #[diagnostic(code(trellis::resolver::deferred))]
    Deferred {
        #[source]
        source: ComponentError,
    },

    /// Draining a chunk stream into a final value failed.
    #[error(transparent)]
    #[diagnostic(code(trellis::resolver::stream))]
    Stream(#[from] StreamError),
}

impl ResolveError {
    /// Name of the component the failure originated in, when known.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            ResolveError::Component { component, .. } => Some(component),
            _ => None,
        }
    }
}

/// Errors surfaced by [`Workflow`](crate::workflow::Workflow) entry points.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    /// The workflow's resolution failed.
    #[error("workflow '{workflow}' failed: {source}")]
    #[diagnostic(code(trellis::workflow::execution))]
    Execution {
        workflow: String,
        #[source]
        source: ResolveError,
    },

    /// `stream` was invoked on a workflow whose root is not a stream component.
    #[error("workflow '{workflow}' does not stream: root component is not a stream component")]
    #[diagnostic(
        code(trellis::workflow::not_streaming),
        help("Declare the root with Component::stream to enable stream mode.")
    )]
    NotStreaming { workflow: String },
}

/// Serializable error payload attached to checkpoint nodes and `error`
/// progress events.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Error family label (e.g. `ComponentError`).
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorDetail {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<&ComponentError> for ErrorDetail {
    fn from(err: &ComponentError) -> Self {
        ErrorDetail::new("ComponentError", err.to_string())
    }
}

impl From<&StreamError> for ErrorDetail {
    fn from(err: &StreamError) -> Self {
        ErrorDetail::new("StreamError", err.to_string())
    }
}

impl From<&ResolveError> for ErrorDetail {
    fn from(err: &ResolveError) -> Self {
        ErrorDetail::new("ResolveError", err.to_string())
    }
}
