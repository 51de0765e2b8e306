//! Domain planning stage.
//!
//! Asks the judge for a planning artifact set (breakdown, failure modes, risk
//! register, verification, rollout, rollback and observability plans) seeded
//! with the domain's planning pack, then back-fills anything the answer left
//! out so downstream stages can rely on every field being present.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::emit_checkpoint;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Aspect, AspectSettings, DomainKind, PackRegistry, PlanningPack, Task, Work, WorkingMemory,
};
use crate::domain::ports::{CheckpointSink, Judge};
use crate::services::pipeline::{Develop, Stage};

const PLANNING_PROMPT: &str = "Create domain planning artifacts for the task using the provided templates and checklists.
Return a single JSON object with keys:
- \"breakdown\" (object based on breakdownTemplate, with answers filled in)
- \"failureModes\" (array of strings, include domain defaults plus task-specific ones)
- \"riskRegister\" (object based on riskRegisterTemplate, 5-10 risks)
- \"verificationPlan\" (object based on verificationPlanTemplate)
- \"rolloutPlan\" (object based on rolloutPlanTemplate)
- \"rollbackPlan\" (object based on rollbackPlanTemplate)
- \"observabilityPlan\" (object based on observabilityPlanTemplate)
- \"notes\" (array of short bullets; tradeoffs, open questions, assumptions)
Keep it compact, concrete, and ASCII-only.";

const FALLBACK_NOTE: &str =
    "Planner output was not a JSON object; using templates and defaults as fallback.";

/// Extension key holding follow-up prompts for a second planning pass.
pub const PLANNING_PROMPTS_KEY: &str = "domainPlanningPrompts";

/// Planning material for one domain, shaped the way the judge sees it.
#[derive(Debug, Clone)]
pub struct PlanningInputs {
    pub domain: String,
    pub templates: Value,
    pub checklists: Value,
    pub defaults: Value,
}

impl PlanningInputs {
    pub fn from_pack(registry: &PackRegistry, pack: &PlanningPack, domain: &str) -> Self {
        let shared = &registry.shared;
        let templates = json!({
            "breakdownTemplate": pack.breakdown_template(domain),
            "riskRegisterTemplate": shared.templates.risk_register,
            "verificationPlanTemplate": shared.templates.verification_plan,
            "rolloutPlanTemplate": shared.templates.rollout_plan,
            "rollbackPlanTemplate": shared.templates.rollback_plan,
            "observabilityPlanTemplate": shared.templates.observability_plan,
        });
        let checklists = json!({
            "riskRegisterChecklist": shared.checklists.risk_register,
            "verificationChecklist": shared.checklists.verification,
            "rolloutChecklist": shared.checklists.rollout,
            "rollbackChecklist": shared.checklists.rollback,
            "observabilityChecklist": shared.checklists.observability,
        });
        let defaults = json!({
            "failureModes": pack.failure_modes,
            "verificationPlan": pack.defaults.verification_plan,
            "rolloutPlan": pack.defaults.rollout_plan,
            "rollbackPlan": pack.defaults.rollback_plan,
            "observabilityPlan": pack.defaults.observability_plan,
            "sloSketch": pack.defaults.slo_sketch,
            "migrationPlan": pack.defaults.migration_plan,
        });

        Self {
            domain: domain.to_string(),
            templates,
            checklists,
            defaults,
        }
    }

    fn template(&self, key: &str) -> Value {
        present(self.templates.get(key)).cloned().unwrap_or(Value::Null)
    }

    fn default(&self, key: &str) -> Option<&Value> {
        present(self.defaults.get(key))
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Turn a raw planner answer into a complete planning record.
///
/// A non-object answer is replaced wholesale by templates and defaults.
/// Otherwise each missing field is filled from the domain default, then the
/// bare template. Fields the planner did provide are never replaced.
pub fn reconcile_plan(response: Value, inputs: &PlanningInputs) -> Value {
    let mut plan = match response {
        Value::Object(map) => map,
        _ => {
            warn!(domain = %inputs.domain, "planner output was not an object, using fallback");
            let mut map = Map::new();
            map.insert("notes".to_string(), json!([FALLBACK_NOTE]));
            map
        }
    };

    fill(&mut plan, "domain", || Value::String(inputs.domain.clone()));
    fill(&mut plan, "breakdown", || inputs.template("breakdownTemplate"));
    fill(&mut plan, "failureModes", || {
        inputs.default("failureModes").cloned().unwrap_or_else(|| json!([]))
    });
    fill(&mut plan, "riskRegister", || inputs.template("riskRegisterTemplate"));
    for (key, template) in [
        ("verificationPlan", "verificationPlanTemplate"),
        ("rolloutPlan", "rolloutPlanTemplate"),
        ("rollbackPlan", "rollbackPlanTemplate"),
        ("observabilityPlan", "observabilityPlanTemplate"),
    ] {
        fill(&mut plan, key, || {
            inputs
                .default(key)
                .cloned()
                .unwrap_or_else(|| inputs.template(template))
        });
    }
    for key in ["sloSketch", "migrationPlan"] {
        if let Some(default) = inputs.default(key) {
            fill(&mut plan, key, || default.clone());
        }
    }

    Value::Object(plan)
}

fn fill(plan: &mut Map<String, Value>, key: &str, value: impl FnOnce() -> Value) {
    if present(plan.get(key)).is_none() {
        plan.insert(key.to_string(), value());
    }
}

/// Preparation stage that produces `domain_planning`.
pub struct DomainPlanningStage {
    domain: DomainKind,
    prompt: String,
    checkpoint: bool,
    judge: Arc<dyn Judge>,
    checkpoints: Arc<dyn CheckpointSink>,
}

impl DomainPlanningStage {
    pub fn new(
        domain: DomainKind,
        judge: Arc<dyn Judge>,
        checkpoints: Arc<dyn CheckpointSink>,
    ) -> Self {
        Self {
            domain,
            prompt: PLANNING_PROMPT.to_string(),
            checkpoint: false,
            judge,
            checkpoints,
        }
    }

    pub fn from_settings(
        domain: DomainKind,
        settings: &AspectSettings,
        judge: Arc<dyn Judge>,
        checkpoints: Arc<dyn CheckpointSink>,
    ) -> Self {
        let mut stage = Self::new(domain, judge, checkpoints).with_checkpoint(settings.checkpoint);
        if let Some(prompt) = &settings.prompt {
            stage.prompt.clone_from(prompt);
        }
        stage
    }

    pub const fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }
}

#[async_trait]
impl Stage for DomainPlanningStage {
    fn name(&self) -> &str {
        Aspect::Planning.as_str()
    }

    #[instrument(skip_all, fields(stage = "planning", domain = %self.domain))]
    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        let normalized = task.normalize();
        let domain_name = memory
            .domain
            .clone()
            .unwrap_or_else(|| self.domain.as_str().to_string());
        let kind = DomainKind::parse(&domain_name).unwrap_or(self.domain);

        let registry = PackRegistry::bundled()?;
        let inputs = PlanningInputs::from_pack(registry, registry.pack(kind)?, &domain_name);

        let context = memory.to_context(
            &normalized,
            [
                ("domain", Value::String(domain_name.clone())),
                ("templates", inputs.templates.clone()),
                ("checklists", inputs.checklists.clone()),
                ("defaults", inputs.defaults.clone()),
            ],
        );
        let response = self.judge.judge(&self.prompt, context).await?;
        let planning = reconcile_plan(response, &inputs);
        memory.record_aspect(Aspect::Planning, planning.clone());

        if self.checkpoint {
            emit_checkpoint(
                self.checkpoints.as_ref(),
                "plan",
                memory,
                json!({ "task": normalized, "domain": domain_name, "domainPlanning": planning }),
            )
            .await;
        }

        let mut prompts = match memory.extension(PLANNING_PROMPTS_KEY) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        prompts.insert(
            "riskRegister".to_string(),
            Value::String(registry.shared.risk_register_prompt.clone()),
        );
        memory.set_extension(PLANNING_PROMPTS_KEY, Value::Object(prompts));

        next.develop(task, memory).await
    }
}
