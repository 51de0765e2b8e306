//! Domain registry: the closed set of task domains and their pipeline profiles.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::aspect::Aspect;
use super::criteria::CriteriaFamily;

/// A named category of task that decides which stages and defaults apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Backend,
    Frontend,
    NextjsApp,
    Infra,
    AwsServerless,
    KubernetesService,
    GcpCloudrun,
    Data,
    Workers,
    Integration,
    Sdk,
    Package,
    GoService,
    RedisCache,
    AzureCosmosdb,
}

/// Stage order and defaults of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DomainProfile {
    pub domain: DomainKind,
    /// Preparation stages in execution order, outermost first.
    pub stages: &'static [Aspect],
    pub threshold: f64,
    pub max_iters: u32,
    pub criteria: CriteriaFamily,
}

const BACKEND_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Research,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Security,
    Aspect::Ops,
    Aspect::ErrorHandling,
    Aspect::Performance,
    Aspect::Docs,
];

const FRONTEND_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Research,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Performance,
    Aspect::Docs,
];

const INFRA_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Research,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Security,
    Aspect::Ops,
    Aspect::Docs,
];

const CLOUD_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Security,
    Aspect::Ops,
    Aspect::Performance,
    Aspect::Docs,
];

const DATA_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Research,
    Aspect::Spec,
    Aspect::DataDriven,
    Aspect::Tests,
];

const WORKERS_STAGES: &[Aspect] = &[Aspect::Spec, Aspect::Tests, Aspect::Ops, Aspect::ErrorHandling];

const INTEGRATION_STAGES: &[Aspect] = &[
    Aspect::Research,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Security,
    Aspect::Docs,
];

const SDK_STAGES: &[Aspect] = &[Aspect::Spec, Aspect::Tests, Aspect::Refactor, Aspect::Docs];

const PACKAGE_STAGES: &[Aspect] = &[Aspect::Spec, Aspect::Tests, Aspect::Docs, Aspect::Git];

const REDIS_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Ops,
    Aspect::Performance,
    Aspect::Docs,
];

const COSMOS_STAGES: &[Aspect] = &[
    Aspect::Planning,
    Aspect::Spec,
    Aspect::Tests,
    Aspect::Ops,
    Aspect::Security,
    Aspect::Performance,
    Aspect::Docs,
];

impl DomainKind {
    /// Every domain in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Backend,
        Self::Frontend,
        Self::NextjsApp,
        Self::Infra,
        Self::AwsServerless,
        Self::KubernetesService,
        Self::GcpCloudrun,
        Self::Data,
        Self::Workers,
        Self::Integration,
        Self::Sdk,
        Self::Package,
        Self::GoService,
        Self::RedisCache,
        Self::AzureCosmosdb,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::NextjsApp => "nextjs_app",
            Self::Infra => "infra",
            Self::AwsServerless => "aws_serverless",
            Self::KubernetesService => "kubernetes_service",
            Self::GcpCloudrun => "gcp_cloudrun",
            Self::Data => "data",
            Self::Workers => "workers",
            Self::Integration => "integration",
            Self::Sdk => "sdk",
            Self::Package => "package",
            Self::GoService => "go_service",
            Self::RedisCache => "redis_cache",
            Self::AzureCosmosdb => "azure_cosmosdb",
        }
    }

    /// Resolve a canonical name or alias. Case-insensitive, trimmed.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        let kind = match normalized.as_str() {
            "backend" | "be" => Self::Backend,
            "frontend" | "ui" | "fe" => Self::Frontend,
            "nextjs_app" | "next" | "nextjs" => Self::NextjsApp,
            "infra" | "infrastructure" | "platform" => Self::Infra,
            "aws_serverless" | "aws" => Self::AwsServerless,
            "kubernetes_service" | "k8s" | "kubernetes" => Self::KubernetesService,
            "gcp_cloudrun" | "gcp" | "cloudrun" => Self::GcpCloudrun,
            "data" => Self::Data,
            "workers" | "worker" | "jobs" => Self::Workers,
            "integration" => Self::Integration,
            "sdk" => Self::Sdk,
            "package" | "pkg" => Self::Package,
            "go_service" | "go" => Self::GoService,
            "redis_cache" | "redis" => Self::RedisCache,
            "azure_cosmosdb" | "cosmos" | "cosmosdb" => Self::AzureCosmosdb,
            _ => return None,
        };
        Some(kind)
    }

    /// Like [`DomainKind::parse`], but unknown names degrade to backend.
    pub fn normalize(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            tracing::warn!(domain = %name, "unknown domain, falling back to backend");
            Self::Backend
        })
    }

    pub const fn profile(&self) -> DomainProfile {
        let (stages, threshold, max_iters, criteria) = match self {
            Self::Backend => (BACKEND_STAGES, 0.9, 5, CriteriaFamily::Backend),
            Self::Frontend | Self::NextjsApp => (FRONTEND_STAGES, 0.9, 4, CriteriaFamily::Frontend),
            Self::Infra => (INFRA_STAGES, 0.9, 5, CriteriaFamily::Infra),
            Self::AwsServerless | Self::KubernetesService | Self::GcpCloudrun => {
                (CLOUD_STAGES, 0.9, 5, CriteriaFamily::Infra)
            }
            Self::Data => (DATA_STAGES, 0.9, 5, CriteriaFamily::Data),
            Self::Workers => (WORKERS_STAGES, 0.9, 5, CriteriaFamily::Workers),
            Self::Integration => (INTEGRATION_STAGES, 0.9, 5, CriteriaFamily::Integration),
            Self::Sdk => (SDK_STAGES, 0.9, 4, CriteriaFamily::Sdk),
            Self::Package => (PACKAGE_STAGES, 0.9, 4, CriteriaFamily::Package),
            Self::GoService => (BACKEND_STAGES, 0.92, 5, CriteriaFamily::Backend),
            Self::RedisCache => (REDIS_STAGES, 0.9, 5, CriteriaFamily::Backend),
            Self::AzureCosmosdb => (COSMOS_STAGES, 0.92, 5, CriteriaFamily::Backend),
        };

        DomainProfile {
            domain: *self,
            stages,
            threshold,
            max_iters,
            criteria,
        }
    }

    /// Key of the planning pack this domain uses.
    ///
    /// Domains without a dedicated pack share the backend one.
    pub const fn pack_key(&self) -> &'static str {
        match self {
            Self::GoService | Self::RedisCache | Self::AzureCosmosdb => "backend",
            other => other.as_str(),
        }
    }

    pub fn accepts(&self, aspect: Aspect) -> bool {
        self.profile().stages.contains(&aspect)
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every domain name in declaration order.
pub fn list_domains() -> Vec<&'static str> {
    DomainKind::ALL.iter().map(DomainKind::as_str).collect()
}
