//! Implementation of the `devloop worker` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use super::{collaborators, stop_on_ctrl_c};
use crate::adapters::CommandQueue;
use crate::cli::display::label;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::WorkQueue;
use crate::services::{dev_work_queue_worker, DevRecipes, DevWorkHandler, WorkerStatus};

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Emit checkpoints from the recipes' pipelines
    #[arg(long)]
    pub checkpoint: bool,

    /// Task text for items that carry none (overrides worker.task)
    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkerSummary {
    pub name: String,
    pub cycles: u64,
    pub empty_polls: u64,
    pub poll_failures: u64,
    pub items_handled: u64,
    pub items_failed: u64,
}

impl WorkerSummary {
    fn new(name: &str, status: &WorkerStatus) -> Self {
        Self {
            name: name.to_string(),
            cycles: status.cycles,
            empty_polls: status.empty_polls,
            poll_failures: status.poll_failures,
            items_handled: status.items_handled,
            items_failed: status.items_failed,
        }
    }
}

impl CommandOutput for WorkerSummary {
    fn to_human(&self) -> String {
        [
            format!("{} {} stopped", label("Worker"), self.name),
            format!("{} {}", label("Cycles"), self.cycles),
            format!(
                "{} {} handled, {} failed",
                label("Items"),
                self.items_handled,
                self.items_failed
            ),
            format!(
                "{} {} empty, {} failed",
                label("Polls"),
                self.empty_polls,
                self.poll_failures
            ),
        ]
        .join("\n")
    }
}

pub async fn execute(args: WorkerArgs, config: &Config, json_mode: bool) -> Result<()> {
    let queue = Arc::new(CommandQueue::from_config(&config.queue)?);
    let recipes = DevRecipes::new(collaborators(config)?)
        .with_checkpoint(args.checkpoint || config.checkpoints.enabled);

    let fallback_task = args.task.unwrap_or_else(|| config.worker.task.clone());
    let mut handler = DevWorkHandler::new(recipes, fallback_task);
    if queue.has_ack() {
        handler = handler.with_ack(queue.clone());
    }

    let work_queue: Arc<dyn WorkQueue> = queue;
    let worker = dev_work_queue_worker(&config.worker, Some(work_queue), Arc::new(handler))?;

    worker.run(stop_on_ctrl_c()).await;

    let status = worker.status().await;
    output(&WorkerSummary::new(worker.name(), &status), json_mode);
    Ok(())
}
