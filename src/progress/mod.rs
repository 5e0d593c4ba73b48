//! Progress event model and delivery sinks.
//!
//! Events are assigned ids and timestamps by the per-run
//! [`CheckpointManager`](crate::checkpoint::CheckpointManager) and dispatched
//! synchronously, so delivery order always matches causal order.

pub mod event;
pub mod sink;

pub use event::{ProgressEvent, ProgressEventKind};
pub use sink::{ChannelSink, FnListener, MemorySink, ProgressSink, StdOutSink};
