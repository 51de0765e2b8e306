use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::WorkingMemory;
use crate::domain::ports::CheckpointSink;

/// Emits every checkpoint as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCheckpointSink;

#[async_trait]
impl CheckpointSink for TracingCheckpointSink {
    async fn checkpoint(
        &self,
        name: &str,
        memory: &WorkingMemory,
        payload: Value,
    ) -> DomainResult<()> {
        info!(
            target: "devloop::checkpoint",
            checkpoint = name,
            at = %Utc::now().to_rfc3339(),
            domain = memory.domain.as_deref().unwrap_or("-"),
            iteration = memory.quality_iteration,
            details = %payload,
            "checkpoint"
        );
        Ok(())
    }
}
