//! Convergence gate: a bounded produce/score/retry loop.
//!
//! The gate runs a producing action, scores each candidate against a
//! criteria set and retries with an improvement task until a candidate meets
//! the threshold or the iteration budget runs out. Exhaustion is a normal
//! outcome reported through [`GateVerdict::BelowThreshold`], not an error.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CriteriaSource, GateVerdict, NormalizedTask, QualityConfig, QualityReport, ScoreCard, Task, Work,
    WorkingMemory,
};
use crate::domain::ports::{CheckpointSink, Judge, NullCheckpointSink, ScoreRequest, Scorer};
use crate::services::pipeline::{Develop, Stage};
use crate::services::stages::emit_checkpoint;

const IMPROVE_TITLE: &str = "Improve work to meet quality criteria";
const IMPROVE_PROMPT: &str = "Improve the previous work to better satisfy the quality criteria. Use the score/feedback to identify gaps, then revise accordingly.";
const SCORE_PROMPT: &str = "Score the work against the quality criteria. Return a JSON object with \"score\" (number between 0 and 1) and \"feedback\" (the gaps to close).";

/// Checkpoint emitted when the budget runs out below threshold.
pub const STUCK_CHECKPOINT: &str = "stuck";

/// One scored attempt.
struct Candidate {
    work: Work,
    score: f64,
    attempt: u32,
    card: ScoreCard,
}

/// Bounded retry loop around a producing action.
pub struct QualityGate {
    threshold: f64,
    max_iters: u32,
    criteria: CriteriaSource,
    scorer: Arc<dyn Scorer>,
    checkpoints: Arc<dyn CheckpointSink>,
}

impl QualityGate {
    pub fn new(
        threshold: f64,
        max_iters: u32,
        criteria: CriteriaSource,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            threshold,
            max_iters: max_iters.max(1),
            criteria,
            scorer,
            checkpoints: Arc::new(NullCheckpointSink),
        }
    }

    /// Build from a resolved configuration; `None` when the gate is disabled.
    pub fn from_config(
        config: &QualityConfig,
        scorer: Arc<dyn Scorer>,
        checkpoints: Arc<dyn CheckpointSink>,
    ) -> Option<Self> {
        match config {
            QualityConfig::Disabled => None,
            QualityConfig::Enabled {
                threshold,
                max_iters,
                criteria,
            } => Some(
                Self::new(*threshold, *max_iters, criteria.clone(), scorer)
                    .with_checkpoints(checkpoints),
            ),
        }
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<dyn CheckpointSink>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub const fn max_iters(&self) -> u32 {
        self.max_iters
    }

    /// Run `produce` until a candidate meets the threshold or the budget is spent.
    ///
    /// # Errors
    /// Only errors from `produce` propagate. Scoring failures count as a
    /// score of 0.
    #[instrument(skip_all, fields(threshold = self.threshold, max_iters = self.max_iters))]
    pub async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        produce: &dyn Develop,
    ) -> DomainResult<Work> {
        let criteria = self.criteria.resolve(task, memory);
        if criteria.is_empty() {
            debug!("no quality criteria, producing once ungated");
            return produce.develop(task, memory).await;
        }

        let normalized = task.normalize();

        let first = self
            .attempt(1, task, &normalized, &criteria, memory, produce)
            .await?;
        if first.score >= self.threshold {
            return Ok(self.accept(first, criteria));
        }
        let mut current = improvement_task(&criteria, &first);
        let mut best = first;

        for attempt in 2..=self.max_iters {
            let candidate = self
                .attempt(attempt, &current, &normalized, &criteria, memory, produce)
                .await?;
            if candidate.score >= self.threshold {
                return Ok(self.accept(candidate, criteria));
            }
            current = improvement_task(&criteria, &candidate);
            if candidate.score > best.score {
                best = candidate;
            }
        }

        warn!(
            best_score = best.score,
            attempts = self.max_iters,
            "quality gate exhausted below threshold"
        );
        emit_checkpoint(
            self.checkpoints.as_ref(),
            STUCK_CHECKPOINT,
            memory,
            json!({
                "reason": "quality_gate_exhausted",
                "threshold": self.threshold,
                "maxIters": self.max_iters,
                "last": {
                    "attempt": self.max_iters,
                    "score": memory.last_score,
                    "feedback": memory.last_feedback,
                    "qualityCriteria": criteria,
                },
            }),
        )
        .await;

        let report = QualityReport {
            verdict: GateVerdict::BelowThreshold,
            score: best.score,
            attempt: best.attempt,
            attempts: self.max_iters,
            threshold: self.threshold,
            criteria,
            feedback: best.card.feedback,
        };
        Ok(best.work.with_quality(report))
    }

    /// Produce one candidate and score it, recording the outcome in memory.
    async fn attempt(
        &self,
        attempt: u32,
        task: &Task,
        normalized: &NormalizedTask,
        criteria: &[String],
        memory: &mut WorkingMemory,
        produce: &dyn Develop,
    ) -> DomainResult<Candidate> {
        memory.quality_iteration = Some(attempt);
        memory.quality_criteria = Some(criteria.to_vec());

        let work = produce.develop(task, memory).await?;

        let request = ScoreRequest {
            task: normalized.clone(),
            work: work.output.clone(),
            criteria: criteria.to_vec(),
            attempt,
            context: serde_json::to_value(&*memory)?,
        };
        let card = match self.scorer.score(&request).await {
            Ok(card) => card,
            Err(e) => {
                warn!(attempt, error = %e, "scoring failed, counting as 0");
                ScoreCard::default()
            }
        };
        let score = card.effective_score();

        memory.last_score = Some(score);
        memory.last_feedback.clone_from(&card.feedback);
        memory.last_work = Some(work.output.clone());
        debug!(attempt, score, "candidate scored");

        Ok(Candidate {
            work,
            score,
            attempt,
            card,
        })
    }

    fn accept(&self, candidate: Candidate, criteria: Vec<String>) -> Work {
        info!(attempt = candidate.attempt, score = candidate.score, "quality threshold met");
        let report = QualityReport {
            verdict: GateVerdict::Accepted,
            score: candidate.score,
            attempt: candidate.attempt,
            attempts: candidate.attempt,
            threshold: self.threshold,
            criteria,
            feedback: candidate.card.feedback,
        };
        candidate.work.with_quality(report)
    }
}

/// Task handed to `produce` on every retry.
fn improvement_task(criteria: &[String], previous: &Candidate) -> Task {
    let mut map = Map::new();
    map.insert("title".to_string(), json!(IMPROVE_TITLE));
    map.insert("prompt".to_string(), json!(IMPROVE_PROMPT));
    map.insert("qualityCriteria".to_string(), json!(criteria));
    map.insert(
        "previous".to_string(),
        json!({ "work": previous.work.output, "scoreResult": previous.card }),
    );
    Task::Structured(map)
}

/// The gate as the innermost pipeline stage; `next` is the producing action.
pub struct QualityGateStage {
    gate: QualityGate,
}

impl QualityGateStage {
    pub fn new(gate: QualityGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl Stage for QualityGateStage {
    fn name(&self) -> &str {
        "quality_gate"
    }

    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        self.gate.run(task, memory, next).await
    }
}

/// Scorer backed by the judge.
pub struct JudgeScorer {
    judge: Arc<dyn Judge>,
    prompt: String,
}

impl JudgeScorer {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            judge,
            prompt: SCORE_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Scorer for JudgeScorer {
    async fn score(&self, request: &ScoreRequest) -> DomainResult<ScoreCard> {
        let mut context = match &request.context {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        context.insert("task".to_string(), serde_json::to_value(&request.task)?);
        context.insert("work".to_string(), request.work.clone());
        context.insert("qualityCriteria".to_string(), json!(request.criteria));
        context.insert("attempt".to_string(), json!(request.attempt));

        let response = self.judge.judge(&self.prompt, Value::Object(context)).await?;
        Ok(ScoreCard::from_response(&response))
    }
}
