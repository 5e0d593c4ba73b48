//! Delivery targets for progress events.
//!
//! Sinks consume whole [`ProgressEvent`]s and decide how to serialize or
//! forward them. Sink failures are isolated by the checkpoint manager: a
//! failing sink is logged and never aborts the workflow.

use std::io::{self, Result as IoResult, Stdout, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::event::ProgressEvent;
use crate::telemetry::{PlainFormatter, ProgressFormatter};

/// Abstraction over an output target that consumes full progress events.
pub trait ProgressSink: Send + Sync {
    /// Handle one event. The sink decides how to render it.
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()>;
}

/// Stdout sink with pluggable formatting.
pub struct StdOutSink<F: ProgressFormatter = PlainFormatter> {
    handle: Stdout,
    formatter: F,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
            formatter: PlainFormatter::new(),
        }
    }
}

impl<F: ProgressFormatter> StdOutSink<F> {
    pub fn with_formatter(formatter: F) -> Self {
        Self {
            handle: io::stdout(),
            formatter,
        }
    }
}

impl<F: ProgressFormatter> ProgressSink for StdOutSink<F> {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        let mut line = self.formatter.render(event);
        line.push('\n');
        self.handle.write_all(line.as_bytes())?;
        self.handle.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every captured event, in delivery order.
    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl ProgressSink for MemorySink {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        self.entries.lock().push(event.clone());
        Ok(())
    }
}

/// Channel-based sink for async consumers (SSE endpoints, dashboards).
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

/// Wraps a user-supplied listener closure as a sink.
///
/// Panics inside the closure are caught and reported as errors so a faulty
/// listener cannot abort the workflow.
pub struct FnListener {
    f: Box<dyn Fn(&ProgressEvent) + Send + Sync>,
}

impl FnListener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl ProgressSink for FnListener {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        catch_unwind(AssertUnwindSafe(|| (self.f)(event)))
            .map_err(|_| io::Error::other("progress listener panicked"))
    }
}
