use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{default_prompt, emit_checkpoint};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Aspect, AspectSettings, ResearchMode, Task, Work, WorkingMemory};
use crate::domain::ports::{CheckpointSink, Judge};
use crate::services::pipeline::{Develop, Stage};

const DECIDE_PROMPT: &str = "Should this task be research-driven first (true/false)? Consider uncertainty, risk, and unfamiliar tech.";

/// Checkpoint name used when the pipeline checkpoints.
pub const RESEARCH_CHECKPOINT: &str = "research";
/// Checkpoint name used when pipeline-wide checkpointing is off.
pub const RESEARCH_NO_CHECKPOINT: &str = "research_no_checkpoint";

/// Optional research pass ahead of the rest of the pipeline.
pub struct ResearchStage {
    mode: ResearchMode,
    prompt: String,
    checkpoint_name: String,
    judge: Arc<dyn Judge>,
    checkpoints: Arc<dyn CheckpointSink>,
}

impl ResearchStage {
    pub fn new(judge: Arc<dyn Judge>, checkpoints: Arc<dyn CheckpointSink>) -> Self {
        Self {
            mode: ResearchMode::Auto,
            prompt: default_prompt(Aspect::Research).to_string(),
            checkpoint_name: RESEARCH_CHECKPOINT.to_string(),
            judge,
            checkpoints,
        }
    }

    pub fn from_settings(
        settings: &AspectSettings,
        judge: Arc<dyn Judge>,
        checkpoints: Arc<dyn CheckpointSink>,
    ) -> Self {
        let mut stage = Self::new(judge, checkpoints).with_mode(settings.mode);
        if let Some(prompt) = &settings.prompt {
            stage.prompt.clone_from(prompt);
        }
        stage.checkpoint_name = match &settings.checkpoint_name {
            Some(name) => name.clone(),
            None if settings.checkpoint => RESEARCH_CHECKPOINT.to_string(),
            None => RESEARCH_NO_CHECKPOINT.to_string(),
        };
        stage
    }

    pub const fn with_mode(mut self, mode: ResearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn checkpoint_name(&self) -> &str {
        &self.checkpoint_name
    }

    async fn should_research(&self, context: Value) -> DomainResult<bool> {
        match self.mode {
            ResearchMode::Always => Ok(true),
            ResearchMode::Never => Ok(false),
            ResearchMode::Auto => {
                let answer = self.judge.judge(DECIDE_PROMPT, context).await?;
                Ok(coerce_bool(&answer))
            }
        }
    }
}

/// Read a yes/no answer out of a judge response.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(text.trim().to_lowercase().as_str(), "true" | "yes"),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Object(map) => ["research", "answer", "value"]
            .iter()
            .find_map(|key| map.get(*key))
            .is_some_and(coerce_bool),
        _ => false,
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> &str {
        Aspect::Research.as_str()
    }

    #[instrument(skip_all, fields(stage = "research", mode = ?self.mode))]
    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        let normalized = task.normalize();

        if !self.should_research(memory.to_context(&normalized, [])).await? {
            debug!("research skipped");
            return next.develop(task, memory).await;
        }

        let research = self
            .judge
            .judge(&self.prompt, memory.to_context(&normalized, []))
            .await?;
        info!(checkpoint = %self.checkpoint_name, "research recorded");
        memory.record_aspect(Aspect::Research, research.clone());

        emit_checkpoint(
            self.checkpoints.as_ref(),
            &self.checkpoint_name,
            memory,
            json!({ "task": normalized, "research": research }),
        )
        .await;

        next.develop(task, memory).await
    }
}
