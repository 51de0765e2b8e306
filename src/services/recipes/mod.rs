//! Work recipes built on assembled pipelines.
//!
//! Each recipe combines one or more domain pipelines with direct judge
//! requests: triage-fix-verify for bugs, plan-execute for enhancements and
//! dependency upgrades, a hotfix flow for incidents and a gated change. The
//! work-queue handler and the maintenance job route queued work into them.

pub mod plan_execute;
pub mod triage;
pub mod work_queue;

pub use plan_execute::{PlanExecute, PlanRun, StepResult, MAX_PLAN_STEPS};
pub use triage::{triage_fix_verify, TriageOutcome};
pub use work_queue::{dev_periodic_maintenance, dev_work_queue_worker, DevWorkHandler, MaintenanceJob};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Aspect, CriteriaSource, QualityConfig, QualityOverrides, QualityToggle, Task, Work,
    WorkingMemory,
};
use crate::services::assembler::{assemble, Collaborators, DevelopOptions, Pipeline};
use crate::services::pipeline::{compose, Develop, JudgeDevelop, Stage};
use crate::services::quality_gate::{QualityGate, QualityGateStage};
use crate::services::stages::{emit_checkpoint, ReviewStage};

const CRITERIA_PROMPT: &str =
    "Determine quality criteria for this task (array of strings). If none needed, return [].";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugfixOutcome {
    #[serde(flatten)]
    pub triage: TriageOutcome,
    pub post: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementOutcome {
    pub plan_run: PlanRun,
    pub wrap_up: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOutcome {
    pub plan_run: PlanRun,
    pub execution: PlanRun,
    pub wrap_up: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentOutcome {
    pub severity: Value,
    pub result: TriageOutcome,
    pub release_checklist: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedChangeOutcome {
    pub work: Work,
    pub summary: Value,
}

/// Options for [`DevRecipes::quality_gated_change`].
#[derive(Debug, Clone, PartialEq)]
pub struct GatedChangeOptions {
    pub threshold: f64,
    pub max_iters: u32,
    pub checkpoint: bool,
    /// Fixed criteria; asked from the judge when `None`.
    pub criteria: Option<Vec<String>>,
}

impl Default for GatedChangeOptions {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            max_iters: 5,
            checkpoint: false,
            criteria: None,
        }
    }
}

/// Recipe entry points sharing one set of collaborators.
#[derive(Clone)]
pub struct DevRecipes {
    collaborators: Collaborators,
    base: Option<Arc<dyn Develop>>,
    checkpoint: bool,
}

impl DevRecipes {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            base: None,
            checkpoint: false,
        }
    }

    /// Production action used by every pipeline the recipes assemble.
    pub fn with_base(mut self, base: Arc<dyn Develop>) -> Self {
        self.base = Some(base);
        self
    }

    pub const fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    fn options(&self) -> DevelopOptions {
        let options = DevelopOptions::new().with_checkpoint(self.checkpoint);
        match &self.base {
            Some(base) => options.with_base(base.clone()),
            None => options,
        }
    }

    fn base(&self) -> Arc<dyn Develop> {
        self.base
            .clone()
            .unwrap_or_else(|| Arc::new(JudgeDevelop::new(self.collaborators.judge.clone())))
    }

    /// The domain pipeline recipes run their develop calls through.
    pub fn develop_for(&self, domain: &str, quality: QualityToggle) -> Pipeline {
        assemble(domain, self.options().with_quality(quality), &self.collaborators)
    }

    async fn ask(
        &self,
        prompt: &str,
        task: &Task,
        memory: &WorkingMemory,
        extra: Vec<(&str, Value)>,
    ) -> DomainResult<Value> {
        let context = memory.to_context(&task.normalize(), extra);
        self.collaborators.judge.judge(prompt, context).await
    }

    /// Triage-fix-verify on the domain pipeline, then a changelog note.
    ///
    /// With `quality` the pipeline gates at 0.9 over 4 attempts; otherwise
    /// the gate is off.
    #[instrument(skip(self, task, memory))]
    pub async fn bugfix(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        domain: &str,
        quality: bool,
    ) -> DomainResult<BugfixOutcome> {
        let toggle = if quality {
            QualityToggle::with_budget(0.9, 4)
        } else {
            QualityToggle::Off
        };
        let develop = self.develop_for(domain, toggle);
        let triage = triage_fix_verify(
            task,
            memory,
            &develop,
            self.collaborators.judge.as_ref(),
            self.collaborators.checkpoints.as_ref(),
        )
        .await?;

        let post = self
            .ask(
                "Summarize the fix and verification in a short changelog-style note.",
                task,
                memory,
                vec![("result", serde_json::to_value(&triage)?)],
            )
            .await?;

        Ok(BugfixOutcome { triage, post })
    }

    /// Plan-execute on the domain pipeline, then a wrap-up.
    ///
    /// An explicit threshold in `quality` also gates every step, with at
    /// most three attempts per step.
    #[instrument(skip(self, task, memory, quality))]
    pub async fn enhancement(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        domain: &str,
        quality: QualityToggle,
    ) -> DomainResult<EnhancementOutcome> {
        let develop = self.develop_for(domain, quality.clone());

        let mut planner = PlanExecute::new(
            self.collaborators.judge.clone(),
            self.collaborators.checkpoints.clone(),
        );
        if let Some(gate) = self.step_gate(&quality, develop.quality()) {
            planner = planner.with_step_gate(gate);
        }
        let plan_run = planner.run(task, memory, &develop).await?;

        let wrap_up = self
            .ask(
                "Write a short wrap-up: what changed, risks, and how to verify.",
                task,
                memory,
                vec![("planRun", serde_json::to_value(&plan_run)?)],
            )
            .await?;

        Ok(EnhancementOutcome { plan_run, wrap_up })
    }

    fn step_gate(&self, quality: &QualityToggle, resolved: &QualityConfig) -> Option<QualityGate> {
        let QualityToggle::Custom(QualityOverrides {
            threshold: Some(threshold),
            max_iters,
            ..
        }) = quality
        else {
            return None;
        };
        let QualityConfig::Enabled { criteria, .. } = resolved else {
            return None;
        };
        (*threshold > 0.0).then(|| {
            QualityGate::new(
                threshold.min(1.0),
                max_iters.unwrap_or(3).clamp(1, 3),
                criteria.clone(),
                self.collaborators.scorer.clone(),
            )
            .with_checkpoints(self.collaborators.checkpoints.clone())
        })
    }

    /// Plan the upgrade, execute the task with that plan in memory, summarize.
    #[instrument(skip_all, fields(packages = packages.len()))]
    pub async fn dependency_upgrade(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        packages: Vec<Value>,
        quality: QualityToggle,
    ) -> DomainResult<UpgradeOutcome> {
        let develop = self.develop_for("package", quality);
        let planner = || {
            PlanExecute::new(
                self.collaborators.judge.clone(),
                self.collaborators.checkpoints.clone(),
            )
        };

        let mut scoped = memory.clone();
        scoped.set_extension("packages", Value::Array(packages));

        let plan_task = Task::structured(
            "Plan dependency upgrade",
            "Plan a dependency upgrade: target versions, breaking changes, upgrade steps, tests, and rollback. Prefer incremental upgrades and verification after each.",
        );
        let plan_run = planner().run(&plan_task, &scoped, &develop).await?;

        scoped.set_extension("upgradePlan", serde_json::to_value(&plan_run)?);
        let execution = planner().run(task, &scoped, &develop).await?;

        let wrap_up = self
            .ask(
                "Write a concise upgrade summary and verification checklist.",
                task,
                memory,
                vec![
                    ("planRun", serde_json::to_value(&plan_run)?),
                    ("execution", serde_json::to_value(&execution)?),
                ],
            )
            .await?;

        Ok(UpgradeOutcome {
            plan_run,
            execution,
            wrap_up,
        })
    }

    /// Severity, triage-fix-verify on a hardened backend pipeline, release checklist.
    #[instrument(skip(self, task, memory))]
    pub async fn incident_hotfix(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        checkpoint: bool,
    ) -> DomainResult<IncidentOutcome> {
        let checkpoints = self.collaborators.checkpoints.as_ref();

        let severity = self
            .ask(
                "Classify incident severity (P0-P3) and required timeline.",
                task,
                memory,
                Vec::new(),
            )
            .await?;
        info!(severity = %severity, "incident classified");
        if checkpoint {
            emit_checkpoint(
                checkpoints,
                "release",
                memory,
                json!({ "phase": "triage", "severity": severity }),
            )
            .await;
        }

        let develop = assemble(
            "backend",
            self.options()
                .with_quality(QualityToggle::with_budget(0.9, 3))
                .with_aspect(Aspect::Ops, true)
                .with_aspect(Aspect::Security, true),
            &self.collaborators,
        );
        let mut scoped = memory.clone();
        scoped.set_extension("severity", severity.clone());
        let result = triage_fix_verify(
            task,
            &scoped,
            &develop,
            self.collaborators.judge.as_ref(),
            checkpoints,
        )
        .await?;

        let release_checklist = self
            .ask(
                "Create a hotfix release checklist: comms, monitoring, rollback, and post-incident follow-ups.",
                task,
                memory,
                vec![
                    ("severity", severity.clone()),
                    ("result", serde_json::to_value(&result)?),
                ],
            )
            .await?;

        if checkpoint {
            if triage::is_blank(&release_checklist) {
                warn!("hotfix produced no release checklist");
                emit_checkpoint(
                    checkpoints,
                    "stuck",
                    memory,
                    json!({ "reason": "missing_release_checklist", "result": result }),
                )
                .await;
            }
            emit_checkpoint(
                checkpoints,
                "release",
                memory,
                json!({ "phase": "release", "releaseChecklist": release_checklist }),
            )
            .await;
        }

        Ok(IncidentOutcome {
            severity,
            result,
            release_checklist,
        })
    }

    /// Spec, tests and a quality gate around the base action, then a summary.
    #[instrument(skip(self, task, memory))]
    pub async fn quality_gated_change(
        &self,
        task: &Task,
        memory: &WorkingMemory,
        options: GatedChangeOptions,
    ) -> DomainResult<GatedChangeOutcome> {
        let judge = &self.collaborators.judge;
        let checkpoints = &self.collaborators.checkpoints;

        let criteria = match options.criteria {
            Some(criteria) => criteria,
            None => coerce_criteria(&self.ask(CRITERIA_PROMPT, task, memory, Vec::new()).await?),
        };

        let gate = QualityGate::new(
            options.threshold,
            options.max_iters,
            CriteriaSource::Static(criteria),
            self.collaborators.scorer.clone(),
        )
        .with_checkpoints(checkpoints.clone());

        let stages: Vec<Option<Arc<dyn Stage>>> = vec![
            Some(Arc::new(
                ReviewStage::new(Aspect::Spec, judge.clone(), checkpoints.clone())
                    .with_checkpoint(options.checkpoint),
            )),
            Some(Arc::new(
                ReviewStage::new(Aspect::Tests, judge.clone(), checkpoints.clone())
                    .with_checkpoint(options.checkpoint),
            )),
            (options.threshold > 0.0).then(|| Arc::new(QualityGateStage::new(gate)) as Arc<dyn Stage>),
        ];
        let develop = compose(self.base(), stages);

        let mut scoped = memory.clone();
        let work = develop.develop(task, &mut scoped).await?;

        let summary = self
            .ask(
                "Write a short summary and verification checklist.",
                task,
                memory,
                vec![("work", serde_json::to_value(&work)?)],
            )
            .await?;

        Ok(GatedChangeOutcome { work, summary })
    }
}

/// Criteria list out of a judge answer; anything but an array of strings is empty.
fn coerce_criteria(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_criteria() {
        assert_eq!(
            coerce_criteria(&json!(["fast", "", 3, "safe"])),
            vec!["fast".to_string(), "safe".to_string()]
        );
        assert!(coerce_criteria(&json!("none")).is_empty());
    }
}
