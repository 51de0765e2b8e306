//! Development work queue handler and periodic maintenance job.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use super::DevRecipes;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    MaintenanceConfig, QualityToggle, QueueItem, Task, WorkerConfig, WorkingMemory,
};
use crate::domain::ports::{AckPayload, AckSink, ItemHandler, Judge, RecurringJob, WorkQueue};
use crate::services::queue_worker::{QueueWorker, QueueWorkerBuilder};
use crate::services::recurring::{RecurringLoop, RecurringLoopBuilder};

const TRIAGE_ITEM_PROMPT: &str = "Handle the queued development work item. If type/domain are unknown, triage and propose next actions. Record what you did.";
const MAINTENANCE_PROMPT: &str = "Run the recurring development maintenance routine described in the task: repo hygiene, dependency checks, flaky test triage, and backlog grooming. Record artifacts and next actions.";

/// Routes a queued item to the recipe matching its `type`, then acks it.
pub struct DevWorkHandler {
    recipes: DevRecipes,
    task: String,
    ack: Option<Arc<dyn AckSink>>,
}

impl DevWorkHandler {
    /// `task` is used for items whose payload carries no task text.
    pub fn new(recipes: DevRecipes, task: impl Into<String>) -> Self {
        Self {
            recipes,
            task: task.into(),
            ack: None,
        }
    }

    pub fn with_ack(mut self, ack: Arc<dyn AckSink>) -> Self {
        self.ack = Some(ack);
        self
    }

    /// Run the recipe for one normalized item and return its result.
    pub async fn dispatch(&self, item: &QueueItem) -> DomainResult<Value> {
        let recipe_task = Task::from(item.task_text().unwrap_or(self.task.as_str()));
        let memory = WorkingMemory::new();

        let result = match item.kind.as_str() {
            "bugfix" => serde_json::to_value(
                self.recipes
                    .bugfix(&recipe_task, &memory, &item.domain, true)
                    .await?,
            )?,
            "enhancement" => serde_json::to_value(
                self.recipes
                    .enhancement(&recipe_task, &memory, &item.domain, QualityToggle::On)
                    .await?,
            )?,
            "dependency_upgrade" => {
                let packages = match item.payload.get("packages") {
                    Some(Value::Array(packages)) => packages.clone(),
                    _ => Vec::new(),
                };
                serde_json::to_value(
                    self.recipes
                        .dependency_upgrade(&recipe_task, &memory, packages, QualityToggle::On)
                        .await?,
                )?
            }
            "incident" | "incident_hotfix" => serde_json::to_value(
                self.recipes
                    .incident_hotfix(&recipe_task, &memory, true)
                    .await?,
            )?,
            _ => {
                let context = memory.to_context(
                    &Task::from(self.task.as_str()).normalize(),
                    [("item", serde_json::to_value(item)?)],
                );
                self.recipes
                    .collaborators()
                    .judge
                    .judge(TRIAGE_ITEM_PROMPT, context)
                    .await?
            }
        };
        Ok(result)
    }
}

#[async_trait]
impl ItemHandler for DevWorkHandler {
    #[instrument(skip_all)]
    async fn handle(&self, raw: Value) -> DomainResult<()> {
        let item = QueueItem::normalize(raw);
        info!(item = %item.identity(), kind = %item.kind, domain = %item.domain, "handling work item");

        let result = self.dispatch(&item).await?;

        if let Some(ack) = &self.ack {
            ack.ack(&item.raw, AckPayload { ok: true, result }).await?;
        }
        Ok(())
    }
}

/// Asks the judge to run the maintenance routine for a fixed task.
pub struct MaintenanceJob {
    judge: Arc<dyn Judge>,
    task: Task,
}

impl MaintenanceJob {
    pub fn new(judge: Arc<dyn Judge>, task: Task) -> Self {
        Self { judge, task }
    }
}

#[async_trait]
impl RecurringJob for MaintenanceJob {
    async fn run_once(&self) -> DomainResult<()> {
        let context = WorkingMemory::new().to_context(&self.task.normalize(), []);
        let notes = self.judge.judge(MAINTENANCE_PROMPT, context).await?;
        info!(notes = %notes, "maintenance routine recorded");
        Ok(())
    }
}

/// Queue worker wired to the development handler.
///
/// # Errors
/// `DomainError::Configuration` when `queue` is missing.
pub fn dev_work_queue_worker(
    config: &WorkerConfig,
    queue: Option<Arc<dyn WorkQueue>>,
    handler: Arc<dyn ItemHandler>,
) -> DomainResult<QueueWorker> {
    let mut builder = QueueWorkerBuilder::from_config(config).handler(handler);
    if let Some(queue) = queue {
        builder = builder.queue(queue);
    }
    builder.build()
}

/// Recurring loop running `job` on the maintenance interval.
///
/// # Errors
/// Never in practice; the job is always supplied.
pub fn dev_periodic_maintenance(
    config: &MaintenanceConfig,
    job: Arc<dyn RecurringJob>,
) -> DomainResult<RecurringLoop> {
    RecurringLoopBuilder::from_config(config).job(job).build()
}
