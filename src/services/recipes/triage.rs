//! Triage, fix, verify.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{NormalizedTask, Task, Work, WorkingMemory};
use crate::domain::ports::{CheckpointSink, Judge};
use crate::services::pipeline::Develop;
use crate::services::stages::emit_checkpoint;

const REPRO_PROMPT: &str =
    "Write a crisp bug report: expected vs actual, repro steps, environment, and impact.";
const VERIFY_PROMPT: &str = "Define verification steps (tests, manual checks) and regressions to prevent. Return a short checklist.";

pub const MAX_HYPOTHESES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub task: NormalizedTask,
    pub repro: Value,
    pub hypotheses: Value,
    pub diagnosis: Work,
    pub fix: Work,
    pub verify: Value,
    pub prevention: Work,
}

/// Treat null, empty strings and empty arrays as "no answer".
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn with_extensions(memory: &WorkingMemory, entries: &[(&str, &Value)]) -> WorkingMemory {
    let mut scoped = memory.clone();
    for (key, value) in entries {
        scoped.set_extension(*key, (*value).clone());
    }
    scoped
}

/// Bug report, hypotheses, diagnosis, minimal fix, verification, regression coverage.
///
/// Unclear triage emits a `stuck` checkpoint but does not stop the run.
#[instrument(skip_all)]
pub async fn triage_fix_verify(
    task: &Task,
    memory: &WorkingMemory,
    develop: &dyn Develop,
    judge: &dyn Judge,
    checkpoints: &dyn CheckpointSink,
) -> DomainResult<TriageOutcome> {
    let normalized = task.normalize();

    let repro = judge
        .judge(REPRO_PROMPT, memory.to_context(&normalized, []))
        .await?;

    let hypotheses_prompt = format!(
        "List up to {MAX_HYPOTHESES} root-cause hypotheses, ordered by likelihood, and what evidence would confirm each."
    );
    let hypotheses = judge
        .judge(
            &hypotheses_prompt,
            memory.to_context(&normalized, [("repro", repro.clone())]),
        )
        .await?;

    if repro.is_null() || is_blank(&hypotheses) {
        warn!("triage produced no repro or hypotheses");
        emit_checkpoint(
            checkpoints,
            "stuck",
            memory,
            json!({ "reason": "insufficient_triage", "repro": repro, "hypotheses": hypotheses }),
        )
        .await;
    }

    let diagnose = Task::structured(
        "Diagnose bug",
        "Narrow the hypotheses to the most likely root cause. Identify the exact change needed and any risky side effects.",
    )
    .with_field("repro", repro.clone())
    .with_field("hypotheses", hypotheses.clone());
    let mut scoped = with_extensions(memory, &[("repro", &repro), ("hypotheses", &hypotheses)]);
    let diagnosis = develop.develop(&diagnose, &mut scoped).await?;

    let fix_task = Task::structured(
        "Implement minimal fix",
        "Implement the smallest safe fix for the identified root cause. Prefer localized changes and avoid refactors unless necessary.",
    )
    .with_field("diagnosis", diagnosis.output.clone());
    let mut scoped = with_extensions(
        memory,
        &[("repro", &repro), ("diagnosis", &diagnosis.output)],
    );
    let fix = develop.develop(&fix_task, &mut scoped).await?;

    let verify = judge
        .judge(
            VERIFY_PROMPT,
            memory.to_context(
                &normalized,
                [
                    ("repro", repro.clone()),
                    ("diagnosis", serde_json::to_value(&diagnosis)?),
                    ("fix", serde_json::to_value(&fix)?),
                ],
            ),
        )
        .await?;

    let prevent = Task::structured(
        "Add regression coverage",
        "Add or update automated coverage (tests or checks) to prevent regression. If tests are infeasible, add a lightweight alternative (assertions, logs, docs).",
    )
    .with_field("verify", verify.clone());
    let mut scoped = with_extensions(memory, &[("fix", &fix.output), ("verify", &verify)]);
    let prevention = develop.develop(&prevent, &mut scoped).await?;

    Ok(TriageOutcome {
        task: normalized,
        repro,
        hypotheses,
        diagnosis,
        fix,
        verify,
        prevention,
    })
}
