//! Working memory threaded through every stage of one pipeline run.
//!
//! Each known stage owns one named field. Stages only ever set their own
//! field; nothing in the pipeline clears a field written by an earlier stage.
//! Anything else goes into `extensions`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::aspect::{Aspect, EnabledAspects};
use super::task::NormalizedTask;

/// Mutable per-run context. One instance per task execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkingMemory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_aspects: Option<EnabledAspects>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_planning: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_review: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops_notes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_handling_notes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_notes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_notes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refactor_guardrails: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_notes: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_criteria: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_iteration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_feedback: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_work: Option<Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory pre-seeded with a domain, as a caller would before assembling.
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    /// The output recorded by an aspect's stage, if it has run.
    pub const fn aspect_output(&self, aspect: Aspect) -> Option<&Value> {
        match aspect {
            Aspect::Planning => self.domain_planning.as_ref(),
            Aspect::Research => self.research.as_ref(),
            Aspect::Spec => self.spec.as_ref(),
            Aspect::Tests => self.test_plan.as_ref(),
            Aspect::Security => self.security_review.as_ref(),
            Aspect::Ops => self.ops_notes.as_ref(),
            Aspect::ErrorHandling => self.error_handling_notes.as_ref(),
            Aspect::Performance => self.performance_notes.as_ref(),
            Aspect::Docs => self.docs_plan.as_ref(),
            Aspect::DataDriven => self.data_notes.as_ref(),
            Aspect::Refactor => self.refactor_guardrails.as_ref(),
            Aspect::Git => self.git_notes.as_ref(),
        }
    }

    /// Store an aspect's output in its own field.
    pub fn record_aspect(&mut self, aspect: Aspect, value: Value) {
        let slot = match aspect {
            Aspect::Planning => &mut self.domain_planning,
            Aspect::Research => &mut self.research,
            Aspect::Spec => &mut self.spec,
            Aspect::Tests => &mut self.test_plan,
            Aspect::Security => &mut self.security_review,
            Aspect::Ops => &mut self.ops_notes,
            Aspect::ErrorHandling => &mut self.error_handling_notes,
            Aspect::Performance => &mut self.performance_notes,
            Aspect::Docs => &mut self.docs_plan,
            Aspect::DataDriven => &mut self.data_notes,
            Aspect::Refactor => &mut self.refactor_guardrails,
            Aspect::Git => &mut self.git_notes,
        };
        *slot = Some(value);
    }

    /// Set domain and enabled aspects unless an outer pipeline already did.
    pub fn seed_domain(&mut self, domain: &str, aspects: &EnabledAspects) {
        if self.domain.is_none() {
            self.domain = Some(domain.to_string());
        }
        if self.domain_aspects.is_none() {
            self.domain_aspects = Some(aspects.clone());
        }
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: Value) {
        self.extensions.insert(key.into(), value);
    }

    /// Build the context object handed to the judge: the memory snapshot
    /// plus the normalized task and any call-specific entries.
    pub fn to_context<'a>(
        &self,
        task: &NormalizedTask,
        extra: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Value {
        let mut context = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        context.insert(
            "task".to_string(),
            serde_json::to_value(task).unwrap_or(Value::Null),
        );
        for (key, value) in extra {
            context.insert(key.to_string(), value);
        }
        Value::Object(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::Task;
    use serde_json::json;

    #[test]
    fn test_record_and_read_aspect_output() {
        let mut memory = WorkingMemory::new();
        memory.record_aspect(Aspect::Docs, json!("update README"));
        assert_eq!(memory.aspect_output(Aspect::Docs), Some(&json!("update README")));
        assert_eq!(memory.docs_plan, Some(json!("update README")));
        assert!(memory.aspect_output(Aspect::Spec).is_none());
    }

    #[test]
    fn test_seed_domain_is_idempotent() {
        let mut memory = WorkingMemory::new();
        let outer: EnabledAspects = [(Aspect::Spec, true)].into_iter().collect();
        let inner: EnabledAspects = [(Aspect::Docs, true)].into_iter().collect();
        memory.seed_domain("workers", &outer);
        memory.seed_domain("backend", &inner);
        assert_eq!(memory.domain.as_deref(), Some("workers"));
        assert_eq!(memory.domain_aspects, Some(outer));
    }

    #[test]
    fn test_context_uses_camel_case_keys_and_task() {
        let mut memory = WorkingMemory::for_domain("backend");
        memory.record_aspect(Aspect::Tests, json!(["unit"]));
        let task = Task::from("ship it").normalize();
        let context = memory.to_context(&task, [("step", json!(1))]);
        assert_eq!(context["testPlan"], json!(["unit"]));
        assert_eq!(context["domain"], json!("backend"));
        assert_eq!(context["task"]["title"], json!("ship it"));
        assert_eq!(context["step"], json!(1));
        assert!(context.get("spec").is_none());
    }
}
