//! Trellis: a declarative framework for composing LLM workflows out of
//! reusable async components.
//!
//! Programs are built in two phases. Construction assembles an [`Element`]
//! tree describing what should run (component calls, provider wrappers,
//! nested lists and objects) without executing anything. Resolution then
//! walks that tree with structured concurrency: independent siblings run in
//! parallel, results land back in their declared positions, and every
//! component invocation is recorded as a node in a checkpoint tree with
//! live progress events along the way.
//!
//! ## Core pieces
//!
//! - [`Component`]: a named async body. Embed it in a tree with
//!   [`Component::call`], or run it directly with [`Component::run`].
//! - [`Element`]: the tagged construction-phase value. Plain JSON values,
//!   lists, objects, component calls, context providers, chunk streams, and
//!   deferred futures all resolve uniformly.
//! - [`Context`]: typed, dynamically scoped values. A provider element makes
//!   a value visible to every component beneath it.
//! - [`Workflow`]: the top-level wrapper. [`Workflow::run`] drains everything
//!   to a final value; [`Workflow::stream`] hands the root component's chunk
//!   stream to the caller live.
//! - [`CheckpointManager`]: per-run execution recording with secret
//!   scrubbing, exposed to callers as [`NodeSnapshot`] trees and
//!   [`ProgressEvent`] sequences.
//!
//! ## Quickstart
//!
//! ```rust
//! use serde_json::json;
//! use trellis::{Component, Element, Props, Workflow};
//!
//! let greet = Component::new("Greet", |props: Props, _scope| async move {
//!     let name = props.get_str("name").unwrap_or("world").to_string();
//!     Ok(Element::value(format!("hello, {name}")))
//! });
//!
//! let workflow = Workflow::new("Greeting", greet);
//! let output = tokio::runtime::Runtime::new()?
//!     .block_on(workflow.run(Props::new().with("name", "trellis")))?;
//! assert_eq!(output, json!("hello, trellis"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Components nest by returning elements that contain further calls; the
//! resolver fans nested work out automatically:
//!
//! ```rust
//! use trellis::{Component, Element, Props};
//!
//! let double = Component::new("Double", |props: Props, _scope| async move {
//!     let n = props.get_i64("n").unwrap_or(0);
//!     Ok(Element::value(n * 2))
//! });
//!
//! let fan_out = Component::new("FanOut", move |_props, _scope| {
//!     let double = double.clone();
//!     async move {
//!         Ok(Element::list(
//!             (1..=3).map(|n| double.call(Props::new().with("n", n))),
//!         ))
//!     }
//! });
//!
//! let out = tokio::runtime::Runtime::new()?
//!     .block_on(fan_out.run(Props::new()))?;
//! assert_eq!(out, serde_json::json!([2, 4, 6]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checkpoint;
pub mod component;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod scope;
pub mod streaming;
pub mod telemetry;
pub mod workflow;

pub use checkpoint::{CheckpointManager, NodeSnapshot, NodeState, STREAMING_PLACEHOLDER};
pub use component::{ANONYMOUS_COMPONENT, Component, ComponentKind, ComponentOpts};
pub use config::TrellisConfig;
pub use context::Context;
pub use element::{Element, Props};
pub use error::{ComponentError, ResolveError, StreamError, WorkflowError};
pub use progress::{
    ChannelSink, FnListener, MemorySink, ProgressEvent, ProgressEventKind, ProgressSink,
    StdOutSink,
};
pub use resolver::execute;
pub use scope::ComponentScope;
pub use streaming::{StreamSender, Streamable};
pub use workflow::{RunOptions, RunReport, Workflow, WorkflowOpts, WorkflowStream};
