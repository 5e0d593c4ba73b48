//! Checkpointing: an in-memory tree of invocation records plus the ordered
//! progress-event stream, built incrementally as components start and finish.
//!
//! Checkpoints are an observability mechanism, not a durability one; nothing
//! here survives the process. Durable storage belongs to collaborator
//! packages consuming [`NodeSnapshot`] or the event stream.

pub mod manager;
pub mod node;
pub(crate) mod secrets;

pub use manager::{CheckpointManager, STREAMING_PLACEHOLDER};
pub use node::{NodeId, NodeSnapshot, NodeState};
