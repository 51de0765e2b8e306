use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::{NormalizedTask, ScoreCard};

/// The external judgment primitive.
///
/// Every natural-language decision in a pipeline (planning, reviews,
/// research, scoring) goes through one of these calls. How the answer is
/// produced is up to the implementation.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Answer `prompt` given `context`.
    ///
    /// # Errors
    /// Returns `DomainError::Judge` when no answer could be produced.
    async fn judge(&self, prompt: &str, context: Value) -> DomainResult<Value>;
}

/// Everything a scorer sees about one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub task: NormalizedTask,
    pub work: Value,
    pub criteria: Vec<String>,
    pub attempt: u32,
    /// Working-memory snapshot at scoring time
    pub context: Value,
}

/// Scores a candidate against a criteria set.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> DomainResult<ScoreCard>;
}
