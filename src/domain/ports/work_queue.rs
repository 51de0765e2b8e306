use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Source of work items. Persistence is the implementation's concern.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Fetch the next batch; an empty batch means no work right now.
    async fn poll_batch(&self) -> DomainResult<Vec<Value>>;
}

/// Acknowledgement sent after an item was handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    pub ok: bool,
    pub result: Value,
}

/// Receives acknowledgements for handled items.
#[async_trait]
pub trait AckSink: Send + Sync {
    async fn ack(&self, raw: &Value, payload: AckPayload) -> DomainResult<()>;
}

/// Handles one polled item.
#[async_trait]
pub trait ItemHandler: Send + Sync {
    async fn handle(&self, item: Value) -> DomainResult<()>;
}

/// One cycle of a recurring loop.
#[async_trait]
pub trait RecurringJob: Send + Sync {
    async fn run_once(&self) -> DomainResult<()>;
}
