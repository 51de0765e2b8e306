//! Judge backed by an external command.
//!
//! The command receives `{"prompt": ..., "context": ...}` as JSON on stdin
//! and answers on stdout. JSON output is parsed; anything else is returned
//! as a trimmed string.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

use super::process::run_command;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::JudgeConfig;
use crate::domain::ports::Judge;

pub struct CommandJudge {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandJudge {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(JudgeConfig::default().timeout_secs),
        }
    }

    /// # Errors
    /// `DomainError::Configuration` when no command is configured.
    pub fn from_config(config: &JudgeConfig) -> DomainResult<Self> {
        if config.command.trim().is_empty() {
            return Err(DomainError::Configuration(
                "judge.command is not set".to_string(),
            ));
        }
        Ok(Self::new(config.command.clone(), config.args.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parse command output: JSON when it parses, else the trimmed text.
pub fn parse_answer(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

#[async_trait]
impl Judge for CommandJudge {
    #[instrument(skip(self, context), fields(program = %self.program))]
    async fn judge(&self, prompt: &str, context: Value) -> DomainResult<Value> {
        let request = serde_json::to_vec(&json!({ "prompt": prompt, "context": context }))?;
        let stdout = run_command(&self.program, &self.args, &request, self.timeout)
            .await
            .map_err(|e| DomainError::Judge(e.to_string()))?;
        Ok(parse_answer(&stdout))
    }
}
