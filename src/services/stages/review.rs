use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::emit_checkpoint;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Aspect, AspectSettings, Task, Work, WorkingMemory};
use crate::domain::ports::{CheckpointSink, Judge};
use crate::services::pipeline::{Develop, Stage};

/// Built-in prompt for an aspect's single judgment request.
pub const fn default_prompt(aspect: Aspect) -> &'static str {
    match aspect {
        Aspect::Spec => {
            "Write or update a concise spec: behavior, acceptance criteria, edge cases, and non-goals."
        }
        Aspect::Tests => {
            "Define a test/verification plan: what to test, where, and how to run it. Keep it actionable."
        }
        Aspect::Security => {
            "Perform a security review: threat model, input validation, authz/authn, secrets, logging, and dependency risks. Return short bullets."
        }
        Aspect::Ops => {
            "Perform an ops review: monitoring/alerts, runbooks, rollback, config, migrations, and safe deploy strategy. Return short bullets."
        }
        Aspect::ErrorHandling => {
            "Perform an error-handling review: failure modes, retries/timeouts, user-facing messages, and logging. Return short bullets."
        }
        Aspect::Performance => {
            "Perform a performance review: complexity, hot paths, caching, and measurement/benchmarks. Return short bullets."
        }
        Aspect::Docs => {
            "Identify doc updates required (README, inline docs, changelog, examples). Return a short actionable plan."
        }
        Aspect::DataDriven => {
            "Make this change data-driven: identify key metrics, logging, experiments, and how to validate via data."
        }
        Aspect::Refactor => {
            "Set refactor guardrails: what NOT to change, allowed scope, and how to keep diffs minimal while still correct."
        }
        Aspect::Git => {
            "Suggest git hygiene for this change: commit breakdown, commit message(s), and what files to avoid touching."
        }
        Aspect::Research => {
            "Research the task and options. Capture key decisions, tradeoffs, and recommended approach."
        }
        Aspect::Planning => {
            "Create domain planning artifacts for the task using the provided templates and checklists."
        }
    }
}

/// The uniform preparation stage used by every single-request aspect.
pub struct ReviewStage {
    aspect: Aspect,
    prompt: String,
    checkpoint: bool,
    judge: Arc<dyn Judge>,
    checkpoints: Arc<dyn CheckpointSink>,
}

impl ReviewStage {
    pub fn new(aspect: Aspect, judge: Arc<dyn Judge>, checkpoints: Arc<dyn CheckpointSink>) -> Self {
        Self {
            aspect,
            prompt: default_prompt(aspect).to_string(),
            checkpoint: false,
            judge,
            checkpoints,
        }
    }

    /// Build from normalized settings: prompt override and checkpoint flag.
    pub fn from_settings(
        aspect: Aspect,
        settings: &AspectSettings,
        judge: Arc<dyn Judge>,
        checkpoints: Arc<dyn CheckpointSink>,
    ) -> Self {
        let mut stage = Self::new(aspect, judge, checkpoints).with_checkpoint(settings.checkpoint);
        if let Some(prompt) = &settings.prompt {
            stage = stage.with_prompt(prompt.clone());
        }
        stage
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub const fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub const fn aspect(&self) -> Aspect {
        self.aspect
    }
}

#[async_trait]
impl Stage for ReviewStage {
    fn name(&self) -> &str {
        self.aspect.as_str()
    }

    #[instrument(skip_all, fields(stage = %self.aspect))]
    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        let normalized = task.normalize();
        let context = memory.to_context(&normalized, []);
        let output = self.judge.judge(&self.prompt, context).await?;
        debug!(stage = %self.aspect, "stage output recorded");
        memory.record_aspect(self.aspect, output.clone());

        if self.checkpoint {
            let mut payload = serde_json::Map::new();
            payload.insert("task".to_string(), json!(normalized));
            payload.insert(self.aspect.memory_key().to_string(), output);
            emit_checkpoint(
                self.checkpoints.as_ref(),
                self.aspect.as_str(),
                memory,
                Value::Object(payload),
            )
            .await;
        }

        next.develop(task, memory).await
    }
}
