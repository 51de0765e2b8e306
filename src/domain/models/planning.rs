//! Domain planning packs
//!
//! Breakdown templates, default failure modes, default plans and criteria
//! packs for every domain, loaded once from the bundled packs file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::domain_kind::DomainKind;
use crate::domain::errors::{DomainError, DomainResult};

const PACKS_YAML: &str = include_str!("../../../packs/planning.yaml");

/// Global pack registry, parsed on first use
static PACKS: OnceLock<Result<PackRegistry, String>> = OnceLock::new();

/// Every planning pack plus the templates they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackRegistry {
    pub shared: SharedPlanning,
    pub domains: BTreeMap<String, PlanningPack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPlanning {
    pub templates: PlanTemplates,
    pub checklists: PlanChecklists,
    /// Follow-up prompt for a second risk-register pass
    pub risk_register_prompt: String,
    /// Criteria every planning output is held to
    pub planning_criteria: Vec<String>,
}

/// Bare templates, used when neither the judge nor the domain supplies a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTemplates {
    pub risk_register: Value,
    pub verification_plan: Value,
    pub rollout_plan: Value,
    pub rollback_plan: Value,
    pub observability_plan: Value,
    pub slo_sketch: Value,
    pub migration_plan: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChecklists {
    pub risk_register: Vec<String>,
    pub verification: Vec<String>,
    pub rollout: Vec<String>,
    pub rollback: Vec<String>,
    pub observability: Vec<String>,
}

/// Planning data for one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningPack {
    #[serde(default)]
    pub breakdown: Option<Value>,
    #[serde(default)]
    pub failure_modes: Vec<String>,
    #[serde(default)]
    pub defaults: PlanDefaults,
    #[serde(default)]
    pub criteria_pack: Vec<String>,
}

/// Domain-specific pre-filled plans. Missing entries fall back to templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefaults {
    pub verification_plan: Option<Value>,
    pub rollout_plan: Option<Value>,
    pub rollback_plan: Option<Value>,
    pub observability_plan: Option<Value>,
    pub slo_sketch: Option<Value>,
    pub migration_plan: Option<Value>,
}

impl PackRegistry {
    /// The bundled registry.
    pub fn bundled() -> DomainResult<&'static Self> {
        PACKS
            .get_or_init(|| serde_yaml::from_str(PACKS_YAML).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| DomainError::Configuration(format!("invalid planning packs: {e}")))
    }

    /// Pack for a domain; domains without their own pack get the backend one.
    pub fn pack(&self, domain: DomainKind) -> DomainResult<&PlanningPack> {
        self.domains
            .get(domain.pack_key())
            .or_else(|| self.domains.get("backend"))
            .ok_or_else(|| {
                DomainError::Configuration(format!("no planning pack for {domain}"))
            })
    }

    /// Shared planning criteria followed by the domain's own criteria pack.
    pub fn criteria_pack(&self, domain: DomainKind) -> DomainResult<Vec<String>> {
        let pack = self.pack(domain)?;
        Ok(self
            .shared
            .planning_criteria
            .iter()
            .chain(&pack.criteria_pack)
            .cloned()
            .collect())
    }
}

impl PlanningPack {
    /// Breakdown template, or an empty one naming the domain.
    pub fn breakdown_template(&self, domain: &str) -> Value {
        self.breakdown
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "domain": domain, "sections": [] }))
    }
}

/// Convenience lookup against the bundled registry.
pub fn planning_pack(domain: DomainKind) -> DomainResult<&'static PlanningPack> {
    PackRegistry::bundled()?.pack(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_packs_parse() {
        let registry = PackRegistry::bundled().unwrap();
        assert_eq!(registry.domains.len(), 12);
        assert_eq!(
            registry.shared.templates.risk_register["schema"],
            serde_json::json!("risk_register/v1")
        );
        assert!(registry.shared.risk_register_prompt.starts_with("Create a risk register"));
    }

    #[test]
    fn test_every_domain_resolves_a_pack() {
        for domain in DomainKind::ALL {
            let pack = planning_pack(domain).unwrap();
            assert!(!pack.failure_modes.is_empty(), "{domain} has no failure modes");
        }
    }

    #[test]
    fn test_backend_pack_has_slo_and_migration() {
        let pack = planning_pack(DomainKind::Backend).unwrap();
        assert!(pack.defaults.slo_sketch.is_some());
        assert!(pack.defaults.migration_plan.is_some());
        assert_eq!(
            pack.defaults.rollout_plan.as_ref().unwrap()["plan"]["strategy"],
            serde_json::json!("canary")
        );
    }

    #[test]
    fn test_criteria_pack_starts_with_shared_criteria() {
        let registry = PackRegistry::bundled().unwrap();
        let criteria = registry.criteria_pack(DomainKind::Frontend).unwrap();
        assert_eq!(criteria.len(), 6 + 3);
        assert!(criteria[0].starts_with("Domain breakdown is explicit"));
    }
}
