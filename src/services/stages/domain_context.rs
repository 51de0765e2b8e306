use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DomainKind, EnabledAspects, Task, Work, WorkingMemory};
use crate::services::pipeline::{Develop, Stage};

/// Outermost stage of every assembled pipeline.
///
/// Records the domain and its enabled aspects unless an enclosing pipeline
/// already did, so nested pipelines keep the outer context.
pub struct DomainContextStage {
    domain: DomainKind,
    enabled: EnabledAspects,
}

impl DomainContextStage {
    pub fn new(domain: DomainKind, enabled: EnabledAspects) -> Self {
        Self { domain, enabled }
    }
}

#[async_trait]
impl Stage for DomainContextStage {
    fn name(&self) -> &str {
        "domain_context"
    }

    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        memory.seed_domain(self.domain.as_str(), &self.enabled);
        next.develop(task, memory).await
    }
}
