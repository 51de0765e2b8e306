//! Per-domain acceptance criteria.
//!
//! Each family has three base statements followed by optional statements
//! appended in a fixed order when the matching aspect is enabled.

use serde::{Deserialize, Serialize};

use super::aspect::{Aspect, EnabledAspects};
use super::memory::WorkingMemory;
use super::quality::CriteriaBuilder;
use super::task::Task;

/// Criteria families shared by one or more domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaFamily {
    Backend,
    Frontend,
    Infra,
    Data,
    Workers,
    Integration,
    Sdk,
    Package,
}

impl CriteriaFamily {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Infra => "infra",
            Self::Data => "data",
            Self::Workers => "workers",
            Self::Integration => "integration",
            Self::Sdk => "sdk",
            Self::Package => "package",
        }
    }

    const fn base(&self) -> [&'static str; 3] {
        match self {
            Self::Backend => [
                "Spec has clear acceptance criteria and edge cases",
                "Test and verification plan is actionable and executed where possible",
                "Implementation is correct, minimal, and maintainable",
            ],
            Self::Frontend => [
                "Spec includes UX behavior and acceptance criteria",
                "UI is usable and polished (empty states, loading, errors)",
                "Verification plan is actionable (unit, e2e, manual checks)",
            ],
            Self::Infra => [
                "Spec covers rollout and rollback strategy",
                "Changes are safe and repeatable (idempotent where applicable)",
                "Verification plan is actionable (plan, diff, smoke checks)",
            ],
            Self::Data => [
                "Spec includes correctness constraints and success metrics",
                "Verification plan covers accuracy, performance, and backfill/migration if needed",
                "Results are reproducible and auditable",
            ],
            Self::Workers => [
                "Spec covers concurrency, ordering, and idempotency expectations",
                "Verification plan covers retries, timeouts, and failure modes",
                "Operational readiness is considered (queues, metrics, alerts)",
            ],
            Self::Integration => [
                "Spec covers contracts, edge cases, and failure handling",
                "Verification plan includes integration tests and safe sandboxing where applicable",
                "Observability and supportability are considered (logs, metrics, tracing)",
            ],
            Self::Sdk => [
                "Public API is consistent, ergonomic, and documented",
                "Semver and backward compatibility considerations are explicit",
                "Test and verification plan covers integration and examples",
            ],
            Self::Package => [
                "Build and packaging steps are validated (install, build, publish dry-run if possible)",
                "Versioning and changelog/release notes are addressed where appropriate",
                "Verification plan is actionable and executed where possible",
            ],
        }
    }

    const fn optional(&self) -> &'static [(Aspect, &'static str)] {
        match self {
            Self::Backend => &[
                (Aspect::ErrorHandling, "Error handling covers failure modes, timeouts, and retries"),
                (Aspect::Security, "Security risks are assessed (inputs, authz/authn, secrets, deps)"),
                (Aspect::Ops, "Ops readiness: monitoring, runbook, rollback, safe deploy strategy"),
                (Aspect::Docs, "Docs and examples are updated as needed"),
            ],
            Self::Frontend => &[
                (Aspect::Performance, "Performance impact is assessed and measured where appropriate"),
                (Aspect::Docs, "Docs and examples are updated as needed"),
            ],
            Self::Infra => &[
                (Aspect::Security, "Security risks are assessed (IAM, network exposure, secrets)"),
                (Aspect::Ops, "Operational readiness: monitoring, alerts, runbooks"),
                (Aspect::Docs, "Docs and runbooks are updated as needed"),
            ],
            Self::Data => &[(
                Aspect::DataDriven,
                "Work includes metrics/logging/experiments to validate impact",
            )],
            Self::Workers => &[
                (
                    Aspect::ErrorHandling,
                    "Error handling covers retries/backoff, poison messages, and DLQ strategy",
                ),
                (Aspect::Ops, "Ops readiness: monitoring, runbooks, safe deploy strategy"),
            ],
            Self::Integration => &[
                (Aspect::Security, "Security risks are assessed (auth, secrets, PII, partner risk)"),
                (Aspect::Docs, "Docs are updated (setup, configs, runbooks)"),
            ],
            Self::Sdk => &[
                (Aspect::Refactor, "Refactor guardrails are followed and diffs stay minimal"),
                (Aspect::Docs, "Docs and examples are updated as needed"),
            ],
            Self::Package => &[
                (Aspect::Git, "Commit plan and file hygiene are reasonable"),
                (Aspect::Docs, "Docs and examples are updated as needed"),
            ],
        }
    }

    /// Base criteria, then each optional criterion whose aspect is enabled.
    pub fn build(&self, enabled: &EnabledAspects) -> Vec<String> {
        let optional = self
            .optional()
            .iter()
            .filter(|(aspect, _)| enabled.is_enabled(*aspect))
            .map(|(_, text)| *text);

        self.base()
            .into_iter()
            .chain(optional)
            .map(str::to_string)
            .collect()
    }
}

/// A criteria family bound to the aspect set of one pipeline build.
#[derive(Debug, Clone)]
pub struct DomainCriteria {
    family: CriteriaFamily,
    enabled: EnabledAspects,
}

impl DomainCriteria {
    pub fn new(family: CriteriaFamily, enabled: EnabledAspects) -> Self {
        Self { family, enabled }
    }
}

impl CriteriaBuilder for DomainCriteria {
    fn build(&self, _task: &Task, _memory: &WorkingMemory) -> Vec<String> {
        self.family.build(&self.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_criteria_only_when_nothing_enabled() {
        let criteria = CriteriaFamily::Backend.build(&EnabledAspects::new());
        assert_eq!(criteria.len(), 3);
        assert_eq!(criteria[0], "Spec has clear acceptance criteria and edge cases");
    }

    #[test]
    fn test_optional_criteria_follow_fixed_order() {
        let enabled: EnabledAspects = [
            (Aspect::Docs, true),
            (Aspect::Security, true),
            (Aspect::ErrorHandling, true),
            (Aspect::Ops, false),
        ]
        .into_iter()
        .collect();
        let criteria = CriteriaFamily::Backend.build(&enabled);
        assert_eq!(criteria.len(), 6);
        assert!(criteria[3].starts_with("Error handling"));
        assert!(criteria[4].starts_with("Security"));
        assert!(criteria[5].starts_with("Docs"));
    }

    #[test]
    fn test_package_git_criterion() {
        let enabled: EnabledAspects = [(Aspect::Git, true)].into_iter().collect();
        let criteria = CriteriaFamily::Package.build(&enabled);
        assert_eq!(
            criteria.last().map(String::as_str),
            Some("Commit plan and file hygiene are reasonable")
        );
    }
}
