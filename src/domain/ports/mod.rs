//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async interfaces adapters must implement:
//! - Judge / Scorer: the external judgment primitive
//! - CheckpointSink: audit snapshots emitted by stages
//! - WorkQueue / AckSink / ItemHandler / RecurringJob: worker loop collaborators

pub mod checkpoint;
pub mod judge;
pub mod work_queue;

pub use checkpoint::{CheckpointSink, NullCheckpointSink};
pub use judge::{Judge, ScoreRequest, Scorer};
pub use work_queue::{AckPayload, AckSink, ItemHandler, RecurringJob, WorkQueue};
