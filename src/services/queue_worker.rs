//! Queue worker loop.
//!
//! Polls a work queue forever and hands every item to a handler, one at a
//! time. Poll and handler failures are logged and absorbed so a single bad
//! item or a flaky queue never stops the loop. When a poll comes back empty
//! the loop sleeps before polling again. The loop ends only when its
//! cancellation token fires.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{QueueItem, WorkerConfig};
use crate::domain::ports::{ItemHandler, WorkQueue};

/// Process-local loop counters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    pub running: bool,
    pub cycles: u64,
    pub empty_polls: u64,
    pub poll_failures: u64,
    pub items_handled: u64,
    pub items_failed: u64,
    pub last_batch_size: usize,
}

/// Sleep for `duration` unless `stop` fires first.
///
/// Returns `false` when the loop should stop.
pub(crate) async fn sleep_or_stop(stop: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return !stop.is_cancelled();
    }
    tokio::select! {
        () = stop.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Builder that validates collaborators before the loop can start.
pub struct QueueWorkerBuilder {
    name: String,
    queue: Option<Arc<dyn WorkQueue>>,
    handler: Option<Arc<dyn ItemHandler>>,
    empty_sleep: Duration,
    per_item_sleep: Duration,
}

impl QueueWorkerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let defaults = WorkerConfig::default();
        Self {
            name: name.into(),
            queue: None,
            handler: None,
            empty_sleep: Duration::from_millis(defaults.empty_sleep_ms),
            per_item_sleep: Duration::from_millis(defaults.per_item_sleep_ms),
        }
    }

    /// Start from the `worker` config section.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.name.clone())
            .empty_sleep(Duration::from_millis(config.empty_sleep_ms))
            .per_item_sleep(Duration::from_millis(config.per_item_sleep_ms))
    }

    pub fn queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn ItemHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub const fn empty_sleep(mut self, duration: Duration) -> Self {
        self.empty_sleep = duration;
        self
    }

    pub const fn per_item_sleep(mut self, duration: Duration) -> Self {
        self.per_item_sleep = duration;
        self
    }

    /// # Errors
    /// `DomainError::Configuration` when the queue or handler is missing.
    pub fn build(self) -> DomainResult<QueueWorker> {
        let queue = self.queue.ok_or_else(|| {
            DomainError::Configuration(format!("worker {}: no work queue configured", self.name))
        })?;
        let handler = self.handler.ok_or_else(|| {
            DomainError::Configuration(format!("worker {}: no item handler configured", self.name))
        })?;

        Ok(QueueWorker {
            name: self.name,
            queue,
            handler,
            empty_sleep: self.empty_sleep,
            per_item_sleep: self.per_item_sleep,
            status: Arc::new(RwLock::new(WorkerStatus::default())),
        })
    }
}

/// Long-lived queue consumer.
pub struct QueueWorker {
    name: String,
    queue: Arc<dyn WorkQueue>,
    handler: Arc<dyn ItemHandler>,
    empty_sleep: Duration,
    per_item_sleep: Duration,
    status: Arc<RwLock<WorkerStatus>>,
}

impl QueueWorker {
    pub fn builder(name: impl Into<String>) -> QueueWorkerBuilder {
        QueueWorkerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared status, readable while the loop runs.
    pub fn status_handle(&self) -> Arc<RwLock<WorkerStatus>> {
        self.status.clone()
    }

    pub async fn status(&self) -> WorkerStatus {
        self.status.read().await.clone()
    }

    /// Run until `stop` is cancelled.
    #[instrument(skip_all, fields(worker = %self.name))]
    pub async fn run(&self, stop: CancellationToken) {
        info!(worker = %self.name, "queue worker started");
        self.status.write().await.running = true;

        while !stop.is_cancelled() {
            self.status.write().await.cycles += 1;

            let batch = match self.queue.poll_batch().await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(worker = %self.name, error = %e, "poll failed");
                    self.status.write().await.poll_failures += 1;
                    Vec::new()
                }
            };
            self.status.write().await.last_batch_size = batch.len();

            if batch.is_empty() {
                debug!(worker = %self.name, sleep_ms = self.empty_sleep.as_millis(), "queue empty; sleeping");
                self.status.write().await.empty_polls += 1;
                if !sleep_or_stop(&stop, self.empty_sleep).await {
                    break;
                }
                continue;
            }

            for item in batch {
                if stop.is_cancelled() {
                    break;
                }
                self.handle_one(item).await;
                if !sleep_or_stop(&stop, self.per_item_sleep).await {
                    break;
                }
            }
        }

        self.status.write().await.running = false;
        info!(worker = %self.name, "queue worker stopped");
    }

    /// Handle one item; failures are logged and counted, never returned.
    ///
    /// The handler runs on its own task so a panic is reported as a failed
    /// item instead of unwinding the loop.
    async fn handle_one(&self, item: serde_json::Value) {
        let identity = QueueItem::normalize(item.clone()).identity();
        let handler = Arc::clone(&self.handler);
        let outcome = match tokio::spawn(async move { handler.handle(item).await }).await {
            Ok(result) => result,
            Err(join) => Err(DomainError::Handler(format!("handler panicked: {join}"))),
        };

        match outcome {
            Ok(()) => {
                debug!(worker = %self.name, item = %identity, "item handled");
                self.status.write().await.items_handled += 1;
            }
            Err(e) => {
                warn!(worker = %self.name, item = %identity, error = %e, "item failed");
                self.status.write().await.items_failed += 1;
            }
        }
    }
}
