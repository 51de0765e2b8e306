//! Plan-then-execute loop.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{NormalizedTask, Task, Work, WorkingMemory};
use crate::domain::ports::{CheckpointSink, Judge};
use crate::services::pipeline::Develop;
use crate::services::quality_gate::QualityGate;
use crate::services::stages::emit_checkpoint;

const PLAN_PROMPT: &str = "Produce an ordered plan as an array of steps. Each step: {\"title\": string, \"task\": string}. Keep steps small and verifiable.";

/// Longest plan that gets executed; extra steps are dropped.
pub const MAX_PLAN_STEPS: usize = 20;

/// Output of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Value,
    pub output: Work,
}

/// Everything a plan-execute run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRun {
    pub task: NormalizedTask,
    pub plan: Vec<Value>,
    pub results: Vec<StepResult>,
}

/// Ask for an ordered plan, then run every step through a develop action.
pub struct PlanExecute {
    judge: Arc<dyn Judge>,
    checkpoints: Arc<dyn CheckpointSink>,
    checkpoint: bool,
    plan_prompt: String,
    max_steps: usize,
    step_gate: Option<QualityGate>,
}

impl PlanExecute {
    pub fn new(judge: Arc<dyn Judge>, checkpoints: Arc<dyn CheckpointSink>) -> Self {
        Self {
            judge,
            checkpoints,
            checkpoint: true,
            plan_prompt: PLAN_PROMPT.to_string(),
            max_steps: MAX_PLAN_STEPS,
            step_gate: None,
        }
    }

    pub const fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_plan_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.plan_prompt = prompt.into();
        self
    }

    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Gate each step separately, with `develop` as the producing action.
    pub fn with_step_gate(mut self, gate: QualityGate) -> Self {
        self.step_gate = Some(gate);
        self
    }

    /// # Errors
    /// Judge failures while planning and develop failures while executing.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        develop: &dyn Develop,
    ) -> DomainResult<PlanRun> {
        let normalized = task.normalize();
        let plan = self
            .judge
            .judge(&self.plan_prompt, memory.to_context(&normalized, []))
            .await?;

        let steps: Vec<Value> = match plan {
            Value::Array(steps) => steps.into_iter().take(self.max_steps).collect(),
            _ => Vec::new(),
        };
        info!(steps = steps.len(), "plan ready");

        if self.checkpoint {
            emit_checkpoint(
                self.checkpoints.as_ref(),
                "plan",
                memory,
                json!({ "task": normalized, "steps": steps }),
            )
            .await;
        }

        let mut results = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let step_task = step_task(step, index);
            let mut step_memory = memory.clone();
            step_memory.set_extension("plan", Value::Array(steps.clone()));
            step_memory.set_extension("step", step.clone());
            step_memory.set_extension("stepIndex", json!(index));

            debug!(step = index + 1, "executing plan step");
            let output = match &self.step_gate {
                Some(gate) => gate.run(&step_task, &mut step_memory, develop).await?,
                None => develop.develop(&step_task, &mut step_memory).await?,
            };
            results.push(StepResult {
                step: step.clone(),
                output,
            });
        }

        Ok(PlanRun {
            task: normalized,
            plan: steps,
            results,
        })
    }
}

/// `step.task`, else `step.title`, else `Step N` (1-based).
fn step_task(step: &Value, index: usize) -> Task {
    ["task", "title"]
        .iter()
        .find_map(|key| step.get(*key).filter(|v| !v.is_null()).cloned())
        .map_or_else(|| Task::Text(format!("Step {}", index + 1)), Task::from)
}
