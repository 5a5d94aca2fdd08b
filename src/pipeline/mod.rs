//! Pipeline orchestration.
//!
//! [`PipelineContext`] holds the per-tick detector state and is fully
//! synchronous. [`Pipeline`] wraps it in the tokio tasks that poll sources,
//! watch the heartbeat and restart streams.

pub mod classify;
pub mod context;
pub mod runner;

pub use classify::{ClassificationResult, ClassificationSlot};
pub use context::{PipelineContext, TickReport};
pub use runner::{Pipeline, PipelineStatus};
