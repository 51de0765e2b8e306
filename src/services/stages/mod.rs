//! Preparation stages.
//!
//! Every stage asks the judge once, records the answer in its own working
//! memory field, optionally emits a checkpoint, then defers to `next`.

pub mod domain_context;
pub mod domain_planning;
pub mod research;
pub mod review;

pub use domain_context::DomainContextStage;
pub use domain_planning::DomainPlanningStage;
pub use research::ResearchStage;
pub use review::{default_prompt, ReviewStage};

use serde_json::Value;
use tracing::warn;

use crate::domain::models::WorkingMemory;
use crate::domain::ports::CheckpointSink;

/// Emit a checkpoint; failures are logged and swallowed.
pub(crate) async fn emit_checkpoint(
    sink: &dyn CheckpointSink,
    name: &str,
    memory: &WorkingMemory,
    payload: Value,
) {
    if let Err(e) = sink.checkpoint(name, memory, payload).await {
        warn!(checkpoint = name, error = %e, "checkpoint failed, continuing");
    }
}
