//! Implementation of the `devloop maintain` command.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use super::{collaborators, stop_on_ctrl_c};
use crate::cli::display::label;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Task};
use crate::domain::ports::RecurringJob;
use crate::services::{dev_periodic_maintenance, MaintenanceJob};

#[derive(Args, Debug)]
pub struct MaintainArgs {
    /// Run the routine once and exit
    #[arg(long)]
    pub once: bool,

    /// Routine description (overrides maintenance.task)
    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MaintainSummary {
    pub name: String,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
}

impl CommandOutput for MaintainSummary {
    fn to_human(&self) -> String {
        format!(
            "{} {}: {} run(s), {} ok, {} failed",
            label("Maintenance"),
            self.name,
            self.total_runs,
            self.successful_runs,
            self.failed_runs
        )
    }
}

pub async fn execute(args: MaintainArgs, config: &Config, json_mode: bool) -> Result<()> {
    let routine = args.task.unwrap_or_else(|| config.maintenance.task.clone());
    if routine.trim().is_empty() {
        bail!("no maintenance task configured; set maintenance.task or pass --task");
    }

    let judge = collaborators(config)?.judge;
    let job = Arc::new(MaintenanceJob::new(judge, Task::from(routine.as_str())));

    let summary = if args.once {
        job.run_once().await?;
        MaintainSummary {
            name: config.maintenance.name.clone(),
            total_runs: 1,
            successful_runs: 1,
            failed_runs: 0,
        }
    } else {
        let runner = dev_periodic_maintenance(&config.maintenance, job)?;
        runner.run(stop_on_ctrl_c()).await;
        let status = runner.status().await;
        MaintainSummary {
            name: runner.name().to_string(),
            total_runs: status.total_runs,
            successful_runs: status.successful_runs,
            failed_runs: status.failed_runs,
        }
    };

    output(&summary, json_mode);
    Ok(())
}
