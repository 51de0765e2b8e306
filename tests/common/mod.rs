//! Common test utilities for integration tests
//!
//! In-memory implementations of the ports plus a few recording helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use devloop::domain::errors::{DomainError, DomainResult};
use devloop::domain::models::{ScoreCard, Task, Work, WorkingMemory};
use devloop::domain::ports::{
    AckPayload, AckSink, CheckpointSink, ItemHandler, RecurringJob, ScoreRequest, Scorer,
    WorkQueue,
};
use devloop::services::Develop;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Checkpoint sink that keeps every emission.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }

    pub fn named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl CheckpointSink for RecordingSink {
    async fn checkpoint(
        &self,
        name: &str,
        _memory: &WorkingMemory,
        payload: Value,
    ) -> DomainResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), payload));
        Ok(())
    }
}

/// Develop action that answers `attempt-N` and records every task title.
#[derive(Default)]
pub struct CountingDevelop {
    titles: Mutex<Vec<String>>,
}

impl CountingDevelop {
    pub fn calls(&self) -> usize {
        self.titles.lock().unwrap().len()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Develop for CountingDevelop {
    async fn develop(&self, task: &Task, _memory: &mut WorkingMemory) -> DomainResult<Work> {
        let mut titles = self.titles.lock().unwrap();
        titles.push(task.normalize().title);
        Ok(Work::new(json!(format!("attempt-{}", titles.len()))))
    }
}

/// Scorer answering from a fixed list; the last score repeats.
pub struct SequenceScorer {
    scores: Vec<f64>,
    calls: AtomicUsize,
}

impl SequenceScorer {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for SequenceScorer {
    async fn score(&self, _request: &ScoreRequest) -> DomainResult<ScoreCard> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let score = self
            .scores
            .get(index)
            .or_else(|| self.scores.last())
            .copied()
            .unwrap_or(0.0);
        Ok(ScoreCard::new(score).with_feedback(json!(format!("gap after {}", index + 1))))
    }
}

/// Scorer that always fails.
pub struct FailingScorer;

#[async_trait]
impl Scorer for FailingScorer {
    async fn score(&self, _request: &ScoreRequest) -> DomainResult<ScoreCard> {
        Err(DomainError::Judge("scorer offline".into()))
    }
}

/// Queue replaying scripted poll results, cancelling `stop` once drained.
pub struct ScriptedQueue {
    polls: Mutex<VecDeque<DomainResult<Vec<Value>>>>,
    stop: CancellationToken,
    poll_count: AtomicUsize,
}

impl ScriptedQueue {
    pub fn new(polls: Vec<DomainResult<Vec<Value>>>, stop: CancellationToken) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            stop,
            poll_count: AtomicUsize::new(0),
        }
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkQueue for ScriptedQueue {
    async fn poll_batch(&self) -> DomainResult<Vec<Value>> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                self.stop.cancel();
                Ok(Vec::new())
            }
        }
    }
}

/// Handler that records items with the (tokio) time they arrived. Items
/// carrying `"fail": true` fail and those carrying `"panic": true` panic.
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<(Value, Instant)>>,
}

impl RecordingHandler {
    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().unwrap().iter().map(|(item, _)| item.clone()).collect()
    }

    pub fn handled_at(&self) -> Vec<Instant> {
        self.seen.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl ItemHandler for RecordingHandler {
    async fn handle(&self, item: Value) -> DomainResult<()> {
        self.seen.lock().unwrap().push((item.clone(), Instant::now()));
        if item.get("panic") == Some(&json!(true)) {
            panic!("handler blew up on {item}");
        }
        if item.get("fail") == Some(&json!(true)) {
            return Err(DomainError::Handler("item rejected".into()));
        }
        Ok(())
    }
}

/// Ack sink that keeps every acknowledgement.
#[derive(Default)]
pub struct RecordingAck {
    acks: Mutex<Vec<(Value, AckPayload)>>,
}

impl RecordingAck {
    pub fn acks(&self) -> Vec<(Value, AckPayload)> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl AckSink for RecordingAck {
    async fn ack(&self, raw: &Value, payload: AckPayload) -> DomainResult<()> {
        self.acks.lock().unwrap().push((raw.clone(), payload));
        Ok(())
    }
}

/// Recurring job that fails on the runs listed in `failing` (1-based) and
/// cancels `stop` after `stop_after` runs.
pub struct FlakyJob {
    runs: AtomicUsize,
    failing: Vec<usize>,
    panicking: Vec<usize>,
    stop_after: usize,
    stop: CancellationToken,
}

impl FlakyJob {
    pub fn new(failing: Vec<usize>, stop_after: usize, stop: CancellationToken) -> Arc<Self> {
        Self::with_panics(failing, Vec::new(), stop_after, stop)
    }

    /// Like [`FlakyJob::new`], additionally panicking on the runs in `panicking`.
    pub fn with_panics(
        failing: Vec<usize>,
        panicking: Vec<usize>,
        stop_after: usize,
        stop: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            failing,
            panicking,
            stop_after,
            stop,
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecurringJob for FlakyJob {
    async fn run_once(&self) -> DomainResult<()> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        if run >= self.stop_after {
            self.stop.cancel();
        }
        if self.panicking.contains(&run) {
            panic!("run {run} panicked");
        }
        if self.failing.contains(&run) {
            return Err(DomainError::Handler(format!("run {run} failed")));
        }
        Ok(())
    }
}
