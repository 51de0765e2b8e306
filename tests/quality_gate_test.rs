//! Convergence gate behavior with scripted scorers.

mod common;

use serde_json::json;
use std::sync::Arc;

use common::{CountingDevelop, FailingScorer, RecordingSink, SequenceScorer};
use devloop::domain::models::{CriteriaSource, GateVerdict, Task, WorkingMemory};
use devloop::domain::ports::Scorer;
use devloop::services::QualityGate;

fn criteria() -> CriteriaSource {
    CriteriaSource::Static(vec!["Handles empty input".to_string()])
}

fn gate(threshold: f64, max_iters: u32, scorer: Arc<dyn Scorer>) -> (QualityGate, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let gate = QualityGate::new(threshold, max_iters, criteria(), scorer).with_checkpoints(sink.clone());
    (gate, sink)
}

#[tokio::test]
async fn test_accepts_once_threshold_is_met() {
    let scorer = Arc::new(SequenceScorer::new(vec![0.4, 0.7, 0.95]));
    let (gate, sink) = gate(0.9, 5, scorer.clone());
    let produce = CountingDevelop::default();
    let mut memory = WorkingMemory::new();

    let work = gate
        .run(&Task::from("Add pagination"), &mut memory, &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 3);
    assert_eq!(scorer.calls(), 3);
    assert_eq!(work.output, json!("attempt-3"));
    let report = work.quality.unwrap();
    assert_eq!(report.verdict, GateVerdict::Accepted);
    assert_eq!(report.attempt, 3);
    assert!((report.score - 0.95).abs() < f64::EPSILON);
    assert!(sink.events().is_empty());

    assert_eq!(memory.quality_iteration, Some(3));
    assert_eq!(memory.last_work, Some(json!("attempt-3")));
}

#[tokio::test]
async fn test_retries_receive_improvement_task() {
    let (gate, _sink) = gate(0.9, 3, Arc::new(SequenceScorer::new(vec![0.2, 0.95])));
    let produce = CountingDevelop::default();

    gate.run(&Task::from("Add pagination"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(
        produce.titles(),
        vec!["Add pagination", "Improve work to meet quality criteria"]
    );
}

#[tokio::test]
async fn test_exhaustion_returns_best_candidate_and_checkpoints() {
    let (gate, sink) = gate(0.9, 3, Arc::new(SequenceScorer::new(vec![0.5, 0.8, 0.6])));
    let produce = CountingDevelop::default();
    let mut memory = WorkingMemory::new();

    let work = gate
        .run(&Task::from("Add pagination"), &mut memory, &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 3);
    assert_eq!(work.output, json!("attempt-2"));
    assert!(!work.is_accepted());
    let report = work.quality.unwrap();
    assert_eq!(report.verdict, GateVerdict::BelowThreshold);
    assert_eq!(report.attempt, 2);
    assert_eq!(report.attempts, 3);

    let stuck = sink.named("stuck");
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0]["reason"], json!("quality_gate_exhausted"));
    assert_eq!(stuck[0]["maxIters"], json!(3));
    assert_eq!(memory.last_score, Some(0.6));
}

#[tokio::test]
async fn test_constant_score_uses_every_attempt() {
    let (gate, _sink) = gate(0.9, 3, Arc::new(SequenceScorer::new(vec![0.5])));
    let produce = CountingDevelop::default();

    let work = gate
        .run(&Task::from("Tune cache"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 3);
    // ties keep the earliest candidate
    assert_eq!(work.output, json!("attempt-1"));
    assert_eq!(work.quality.unwrap().verdict, GateVerdict::BelowThreshold);
}

#[tokio::test]
async fn test_scoring_failure_counts_as_zero() {
    let (gate, sink) = gate(0.5, 2, Arc::new(FailingScorer));
    let produce = CountingDevelop::default();

    let work = gate
        .run(&Task::from("Tune cache"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 2);
    let report = work.quality.unwrap();
    assert_eq!(report.verdict, GateVerdict::BelowThreshold);
    assert!(report.score.abs() < f64::EPSILON);
    assert_eq!(sink.names(), vec!["stuck"]);
}

#[tokio::test]
async fn test_zero_budget_still_produces_once() {
    let (gate, _sink) = gate(0.9, 0, Arc::new(SequenceScorer::new(vec![0.1])));
    assert_eq!(gate.max_iters(), 1);
    let produce = CountingDevelop::default();

    let work = gate
        .run(&Task::from("Tune cache"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 1);
    assert_eq!(work.quality.unwrap().attempts, 1);
}

#[tokio::test]
async fn test_empty_criteria_runs_ungated() {
    let scorer = Arc::new(SequenceScorer::new(vec![0.1]));
    let gate = QualityGate::new(0.9, 4, CriteriaSource::Static(Vec::new()), scorer.clone());
    let produce = CountingDevelop::default();

    let work = gate
        .run(&Task::from("Tune cache"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 1);
    assert_eq!(scorer.calls(), 0);
    assert!(work.quality.is_none());
}

#[tokio::test]
async fn test_single_attempt_below_threshold_is_scored() {
    let scorer = Arc::new(SequenceScorer::new(vec![0.4]));
    let (gate, sink) = gate(0.9, 1, scorer.clone());
    let produce = CountingDevelop::default();

    let work = gate
        .run(&Task::from("Tune cache"), &mut WorkingMemory::new(), &produce)
        .await
        .unwrap();

    assert_eq!(produce.calls(), 1);
    assert_eq!(scorer.calls(), 1);
    assert_eq!(work.output, json!("attempt-1"));
    let report = work.quality.unwrap();
    assert_eq!(report.verdict, GateVerdict::BelowThreshold);
    assert_eq!(report.attempt, 1);
    assert!((report.score - 0.4).abs() < f64::EPSILON);
    assert_eq!(sink.names(), vec!["stuck"]);
}
