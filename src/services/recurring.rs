//! Fixed-interval recurring loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use super::queue_worker::sleep_or_stop;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::MaintenanceConfig;
use crate::domain::ports::RecurringJob;

/// Counters for a recurring loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringStatus {
    pub running: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_elapsed_ms: Option<u64>,
}

pub struct RecurringLoopBuilder {
    name: String,
    job: Option<Arc<dyn RecurringJob>>,
    interval: Duration,
}

impl RecurringLoopBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            job: None,
            interval: Duration::from_millis(MaintenanceConfig::default().interval_ms),
        }
    }

    pub fn from_config(config: &MaintenanceConfig) -> Self {
        Self::new(config.name.clone()).interval(Duration::from_millis(config.interval_ms))
    }

    pub fn job(mut self, job: Arc<dyn RecurringJob>) -> Self {
        self.job = Some(job);
        self
    }

    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// # Errors
    /// `DomainError::Configuration` when no job was supplied.
    pub fn build(self) -> DomainResult<RecurringLoop> {
        let job = self.job.ok_or_else(|| {
            DomainError::Configuration(format!("loop {}: no job configured", self.name))
        })?;
        Ok(RecurringLoop {
            name: self.name,
            job,
            interval: self.interval,
            status: Arc::new(RwLock::new(RecurringStatus::default())),
        })
    }
}

/// Runs a job, sleeps for the interval, repeats. Job failures never end the loop.
pub struct RecurringLoop {
    name: String,
    job: Arc<dyn RecurringJob>,
    interval: Duration,
    status: Arc<RwLock<RecurringStatus>>,
}

impl RecurringLoop {
    pub fn builder(name: impl Into<String>) -> RecurringLoopBuilder {
        RecurringLoopBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status_handle(&self) -> Arc<RwLock<RecurringStatus>> {
        self.status.clone()
    }

    pub async fn status(&self) -> RecurringStatus {
        self.status.read().await.clone()
    }

    #[instrument(skip_all, fields(job = %self.name))]
    pub async fn run(&self, stop: CancellationToken) {
        info!(job = %self.name, interval_ms = self.interval.as_millis(), "recurring loop started");
        self.status.write().await.running = true;

        while !stop.is_cancelled() {
            let started = Instant::now();
            let job = Arc::clone(&self.job);
            let result = match tokio::spawn(async move { job.run_once().await }).await {
                Ok(result) => result,
                Err(join) => Err(DomainError::Handler(format!("run panicked: {join}"))),
            };
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            {
                let mut status = self.status.write().await;
                status.total_runs += 1;
                status.last_elapsed_ms = Some(elapsed_ms);
                match &result {
                    Ok(()) => status.successful_runs += 1,
                    Err(_) => status.failed_runs += 1,
                }
            }

            match result {
                Ok(()) => info!(job = %self.name, elapsed_ms, "run complete"),
                Err(e) => error!(job = %self.name, elapsed_ms, error = %e, "run failed"),
            }

            if !sleep_or_stop(&stop, self.interval).await {
                break;
            }
        }

        self.status.write().await.running = false;
        info!(job = %self.name, "recurring loop stopped");
    }
}
