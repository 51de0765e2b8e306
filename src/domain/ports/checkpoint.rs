use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::WorkingMemory;

/// Side channel for audit/resume snapshots.
///
/// Callers log and ignore failures; a checkpoint never aborts a stage.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn checkpoint(&self, name: &str, memory: &WorkingMemory, payload: Value)
        -> DomainResult<()>;
}

/// A sink that drops every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCheckpointSink;

#[async_trait]
impl CheckpointSink for NullCheckpointSink {
    async fn checkpoint(
        &self,
        _name: &str,
        _memory: &WorkingMemory,
        _payload: Value,
    ) -> DomainResult<()> {
        Ok(())
    }
}
