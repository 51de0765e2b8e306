//! Work queue backed by external commands.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use super::process::{run_command, split_command};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::QueueConfig;
use crate::domain::ports::{AckPayload, AckSink, WorkQueue};

/// Poll command prints a JSON array of items; the ack command receives
/// `{"item", "ok", "result"}` on stdin.
pub struct CommandQueue {
    poll: Vec<String>,
    ack: Vec<String>,
    timeout: Duration,
}

impl CommandQueue {
    /// # Errors
    /// `DomainError::Configuration` when no poll command is configured.
    pub fn from_config(config: &QueueConfig) -> DomainResult<Self> {
        if config.poll_command.is_empty() {
            return Err(DomainError::Configuration(
                "queue.poll_command is not set".to_string(),
            ));
        }
        Ok(Self {
            poll: config.poll_command.clone(),
            ack: config.ack_command.clone(),
            timeout: Duration::from_secs(60),
        })
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_ack(&self) -> bool {
        !self.ack.is_empty()
    }
}

/// Items out of poll output. Blank output is an empty batch; a single
/// object is a batch of one.
pub fn parse_batch(stdout: &str) -> DomainResult<Vec<Value>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(trimmed)
        .map_err(|e| DomainError::Queue(format!("poll output is not JSON: {e}")))?
    {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        item => Ok(vec![item]),
    }
}

#[async_trait]
impl WorkQueue for CommandQueue {
    #[instrument(skip(self))]
    async fn poll_batch(&self) -> DomainResult<Vec<Value>> {
        let (program, args) = split_command(&self.poll)
            .ok_or_else(|| DomainError::Configuration("queue.poll_command is empty".into()))?;
        let stdout = run_command(program, args, b"", self.timeout)
            .await
            .map_err(|e| DomainError::Queue(e.to_string()))?;
        let batch = parse_batch(&stdout)?;
        debug!(items = batch.len(), "polled");
        Ok(batch)
    }
}

#[async_trait]
impl AckSink for CommandQueue {
    async fn ack(&self, raw: &Value, payload: AckPayload) -> DomainResult<()> {
        let Some((program, args)) = split_command(&self.ack) else {
            return Ok(());
        };
        let body = serde_json::to_vec(&json!({
            "item": raw,
            "ok": payload.ok,
            "result": payload.result,
        }))?;
        run_command(program, args, &body, self.timeout)
            .await
            .map_err(|e| DomainError::Queue(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        assert!(parse_batch("\n").unwrap().is_empty());
        assert_eq!(parse_batch("[1, 2]").unwrap().len(), 2);
        assert_eq!(parse_batch(r#"{"type": "bugfix"}"#).unwrap().len(), 1);
        assert!(parse_batch("nope").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_poll_runs_command() {
        let queue = CommandQueue::from_config(&QueueConfig {
            poll_command: vec!["echo".into(), r#"[{"id": "a"}]"#.into()],
            ack_command: Vec::new(),
        })
        .unwrap();
        let batch = queue.poll_batch().await.unwrap();
        assert_eq!(batch, vec![json!({"id": "a"})]);
        assert!(!queue.has_ack());
    }
}
