//! Workflow wrapper: the top-level entry point around a root component.
//!
//! Each invocation instantiates a fresh [`WorkflowExecutionContext`] (its own
//! checkpoint manager and event-id counter), runs the resolver over the root
//! element, and returns either the final value or, for stream-kind roots,
//! a live [`WorkflowStream`] of chunks. Once started, a run proceeds to
//! completion or failure; abandoning a `WorkflowStream` early is the only
//! supported early exit.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{Stream, StreamExt};
use serde_json::Value;
use uuid::Uuid;

use crate::checkpoint::{CheckpointManager, NodeSnapshot};
use crate::component::{Component, ComponentKind};
use crate::config::TrellisConfig;
use crate::element::Props;
use crate::error::{StreamError, WorkflowError};
use crate::progress::{FnListener, ProgressEvent, ProgressSink};
use crate::resolver::{Resolved, materialize, resolve};
use crate::scope::{ComponentScope, WorkflowExecutionContext};
use crate::streaming::Streamable;

/// Workflow-level configuration.
#[derive(Debug, Default)]
pub struct WorkflowOpts {
    /// Override for printing the console execution URL after a run.
    pub print_url: Option<bool>,
    /// Metadata merged into the root checkpoint node.
    pub metadata: serde_json::Map<String, Value>,
}

/// Per-run options.
#[derive(Default)]
pub struct RunOptions {
    sinks: Vec<Box<dyn ProgressSink>>,
    print_url: Option<bool>,
    capture_checkpoints: Option<bool>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a progress sink for this run.
    #[must_use]
    pub fn with_sink<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Register a listener closure invoked for every progress event.
    #[must_use]
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.sinks.push(Box::new(FnListener::new(listener)));
        self
    }

    /// Override URL printing for this run.
    #[must_use]
    pub fn print_url(mut self, print: bool) -> Self {
        self.print_url = Some(print);
        self
    }

    /// Override checkpoint/progress capture for this run (defaults to the
    /// `TRELLIS_CHECKPOINTS` configuration).
    #[must_use]
    pub fn capture_checkpoints(mut self, capture: bool) -> Self {
        self.capture_checkpoints = Some(capture);
        self
    }
}

/// Result of a completed run: the output plus the recorded execution tree.
#[derive(Debug)]
pub struct RunReport {
    pub output: Value,
    /// `None` when checkpoint capture is disabled.
    pub checkpoint: Option<NodeSnapshot>,
    pub run_id: Uuid,
}

/// A named, runnable workflow around a root component.
pub struct Workflow {
    name: String,
    root: Component,
    opts: WorkflowOpts,
}

impl Workflow {
    pub fn new(name: impl Into<String>, root: Component) -> Self {
        Self::with_opts(name, WorkflowOpts::default(), root)
    }

    pub fn with_opts(name: impl Into<String>, opts: WorkflowOpts, root: Component) -> Self {
        Self {
            name: name.into(),
            root,
            opts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run to completion and return the final value.
    pub async fn run(&self, props: Props) -> Result<Value, WorkflowError> {
        self.run_with(props, RunOptions::default())
            .await
            .map(|report| report.output)
    }

    /// Run to completion with per-run options; returns the output together
    /// with the recorded checkpoint tree.
    pub async fn run_with(
        &self,
        props: Props,
        options: RunOptions,
    ) -> Result<RunReport, WorkflowError> {
        let (run, config, print_url) = self.setup(options);
        run.manager().start(&self.name);

        let scope = ComponentScope::root(Arc::clone(&run));
        let element = self.root.call(props);
        let outcome = match resolve(element, scope).await {
            Ok(resolved) => materialize(resolved).await,
            Err(err) => Err(err),
        };

        if !self.opts.metadata.is_empty() {
            run.manager().add_root_metadata(self.opts.metadata.clone());
        }
        run.manager().finish();

        let output = outcome.map_err(|source| WorkflowError::Execution {
            workflow: self.name.clone(),
            source,
        })?;

        if config.should_print_url(print_url) {
            print_execution_url(&config, &run.run_id().to_string(), &self.name);
        }

        Ok(RunReport {
            output,
            checkpoint: run.manager().snapshot(),
            run_id: run.run_id(),
        })
    }

    /// Run in stream mode: the root component's chunk sequence is handed to
    /// the caller live instead of being drained.
    pub async fn stream(&self, props: Props) -> Result<WorkflowStream, WorkflowError> {
        self.stream_with(props, RunOptions::default()).await
    }

    pub async fn stream_with(
        &self,
        props: Props,
        options: RunOptions,
    ) -> Result<WorkflowStream, WorkflowError> {
        if self.root.kind() != ComponentKind::Stream {
            return Err(WorkflowError::NotStreaming {
                workflow: self.name.clone(),
            });
        }
        let (run, config, print_url) = self.setup(options);
        run.manager().start(&self.name);

        let scope = ComponentScope::root(Arc::clone(&run));
        let element = self.root.call(props);
        let resolved = match resolve(element, scope).await {
            Ok(resolved) => resolved,
            Err(source) => {
                run.manager().finish();
                return Err(WorkflowError::Execution {
                    workflow: self.name.clone(),
                    source,
                });
            }
        };
        if !self.opts.metadata.is_empty() {
            run.manager().add_root_metadata(self.opts.metadata.clone());
        }

        let stream = match resolved {
            Resolved::Stream(stream) => stream,
            // A stream-kind root may still resolve to a plain value (e.g. a
            // cached result); expose it as a single chunk.
            Resolved::Value(Value::String(text)) => Streamable::from_chunks([text]),
            Resolved::Value(other) => Streamable::from_chunks([other.to_string()]),
        };
        let url = config
            .should_print_url(print_url)
            .then(|| config.execution_url(&run.run_id().to_string(), &self.name));
        Ok(WorkflowStream {
            inner: stream,
            run,
            url,
            done: false,
        })
    }

    fn setup(&self, options: RunOptions) -> (Arc<WorkflowExecutionContext>, TrellisConfig, Option<bool>) {
        let config = TrellisConfig::from_env();
        let enabled = options
            .capture_checkpoints
            .unwrap_or(config.checkpoints_enabled);
        let manager = CheckpointManager::new(enabled);
        for sink in options.sinks {
            manager.add_sink(sink);
        }
        let print_url = options.print_url.or(self.opts.print_url);
        (WorkflowExecutionContext::new(manager), config, print_url)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("root", &self.root.name())
            .finish_non_exhaustive()
    }
}

/// Live chunk stream handed out by [`Workflow::stream`].
///
/// The workflow's `end` event fires when the stream is exhausted, or on
/// drop, so abandoning consumption early still closes the event sequence.
pub struct WorkflowStream {
    inner: Streamable,
    run: Arc<WorkflowExecutionContext>,
    url: Option<String>,
    done: bool,
}

impl WorkflowStream {
    pub fn run_id(&self) -> Uuid {
        self.run.run_id()
    }

    /// Snapshot of the checkpoint tree recorded so far.
    pub fn checkpoint(&self) -> Option<NodeSnapshot> {
        self.run.manager().snapshot()
    }

    /// Pull the next chunk, or `None` once the sequence is exhausted.
    pub async fn next_chunk(&mut self) -> Option<Result<String, StreamError>> {
        self.next().await
    }

    /// Drain the remaining chunks into one string, in emission order.
    pub async fn collect_text(mut self) -> Result<String, StreamError> {
        let mut out = String::new();
        while let Some(chunk) = self.next().await {
            out.push_str(&chunk?);
        }
        Ok(out)
    }

    fn finalize(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.run.manager().finish();
        if let Some(url) = self.url.take() {
            println!("\n\x1b[33m[trellis] View execution at:\x1b[0m \x1b[1;34m{url}\x1b[0m\n");
        }
    }
}

impl std::fmt::Debug for WorkflowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStream")
            .field("run_id", &self.run.run_id())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Stream for WorkflowStream {
    type Item = Result<String, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(None) => {
                self.finalize();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                // Terminal: a mid-stream error ends the sequence abnormally.
                self.finalize();
                Poll::Ready(Some(Err(err)))
            }
            other => other,
        }
    }
}

impl Drop for WorkflowStream {
    fn drop(&mut self) {
        self.finalize();
    }
}

fn print_execution_url(config: &TrellisConfig, run_id: &str, workflow_name: &str) {
    let url = config.execution_url(run_id, workflow_name);
    println!("\n\x1b[33m[trellis] View execution at:\x1b[0m \x1b[1;34m{url}\x1b[0m\n");
}
