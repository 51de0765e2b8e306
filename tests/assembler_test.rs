//! Pipeline assembly from the domain registry, run against a scripted judge.

mod common;

use serde_json::json;
use std::sync::Arc;

use common::{CountingDevelop, RecordingSink};
use devloop::adapters::ScriptedJudge;
use devloop::domain::models::{
    Aspect, AspectOverrides, AspectToggle, DomainKind, GateVerdict, QualityToggle, ResearchMode,
    Task, WorkingMemory,
};
use devloop::services::stages::default_prompt;
use devloop::services::{assemble, Collaborators, Develop, DevelopOptions};

fn collaborators(judge: &Arc<ScriptedJudge>) -> Collaborators {
    Collaborators::new(judge.clone())
}

#[test]
fn test_unknown_domain_behaves_as_backend() {
    let judge = Arc::new(ScriptedJudge::new());
    let unknown = assemble("cobol_mainframe", DevelopOptions::new(), &collaborators(&judge));
    let backend = assemble("backend", DevelopOptions::new(), &collaborators(&judge));

    assert_eq!(unknown.domain(), DomainKind::Backend);
    assert_eq!(unknown.enabled(), backend.enabled());
}

#[test]
fn test_aliases_pick_their_domain() {
    let judge = Arc::new(ScriptedJudge::new());
    for (alias, expected) in [
        ("ui", DomainKind::Frontend),
        ("k8s", DomainKind::KubernetesService),
        ("Jobs", DomainKind::Workers),
        ("cosmos", DomainKind::AzureCosmosdb),
    ] {
        let pipeline = assemble(alias, DevelopOptions::new(), &collaborators(&judge));
        assert_eq!(pipeline.domain(), expected, "alias {alias}");
    }
}

#[tokio::test]
async fn test_stages_run_in_profile_order() {
    let judge = Arc::new(ScriptedJudge::new());
    let pipeline = assemble(
        "jobs",
        DevelopOptions::new().without_quality(),
        &collaborators(&judge),
    );
    let mut memory = WorkingMemory::new();

    let work = pipeline
        .develop(&Task::from("Retry failed webhooks"), &mut memory)
        .await
        .unwrap();

    let prompts = judge.prompts();
    assert_eq!(
        prompts,
        vec![
            default_prompt(Aspect::Spec).to_string(),
            default_prompt(Aspect::Tests).to_string(),
            default_prompt(Aspect::Ops).to_string(),
            default_prompt(Aspect::ErrorHandling).to_string(),
            "Retry failed webhooks".to_string(),
        ]
    );
    assert_eq!(work.output, json!("Retry failed webhooks"));
    assert!(work.quality.is_none());

    assert_eq!(memory.domain.as_deref(), Some("workers"));
    assert!(memory.spec.is_some());
    assert!(memory.test_plan.is_some());
    assert!(memory.ops_notes.is_some());
    assert!(memory.error_handling_notes.is_some());
}

#[tokio::test]
async fn test_disabled_aspect_is_skipped() {
    let judge = Arc::new(ScriptedJudge::new());
    let pipeline = assemble(
        "workers",
        DevelopOptions::new()
            .without_quality()
            .with_aspect(Aspect::Ops, false),
        &collaborators(&judge),
    );

    pipeline
        .develop(&Task::from("Retry failed webhooks"), &mut WorkingMemory::new())
        .await
        .unwrap();

    assert_eq!(judge.count_matching(default_prompt(Aspect::Ops)), 0);
    assert_eq!(judge.prompts().len(), 4);
}

#[tokio::test]
async fn test_research_auto_mode_asks_first() {
    let judge = Arc::new(
        ScriptedJudge::new()
            .on("research-driven first", json!(true))
            .on("Create domain planning artifacts", json!({"breakdown": {"sections": []}})),
    );
    let pipeline = assemble(
        "frontend",
        DevelopOptions::new().without_quality(),
        &collaborators(&judge),
    );
    let mut memory = WorkingMemory::new();

    pipeline
        .develop(&Task::from("Add dark mode"), &mut memory)
        .await
        .unwrap();

    let prompts = judge.prompts();
    assert!(prompts[0].starts_with("Create domain planning artifacts"));
    assert!(prompts[1].contains("research-driven first"));
    assert_eq!(prompts[2], default_prompt(Aspect::Research));
    assert_eq!(prompts[3], default_prompt(Aspect::Spec));
    assert!(memory.research.is_some());

    let planning = memory.domain_planning.unwrap();
    assert_eq!(planning["domain"], json!("frontend"));
    assert!(planning.get("riskRegister").is_some());
}

#[tokio::test]
async fn test_research_never_mode_skips_the_question() {
    let judge = Arc::new(ScriptedJudge::new());
    let pipeline = assemble(
        "integration",
        DevelopOptions::new()
            .without_quality()
            .with_aspect(
                Aspect::Research,
                AspectToggle::Custom(AspectOverrides {
                    mode: Some(ResearchMode::Never),
                    ..AspectOverrides::default()
                }),
            ),
        &collaborators(&judge),
    );

    pipeline
        .develop(&Task::from("Sync invoices"), &mut WorkingMemory::new())
        .await
        .unwrap();

    assert_eq!(judge.count_matching("research-driven first"), 0);
    assert_eq!(judge.count_matching(default_prompt(Aspect::Research)), 0);
}

#[tokio::test]
async fn test_checkpoint_flag_reaches_spec_and_tests() {
    let judge = Arc::new(ScriptedJudge::new());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = assemble(
        "sdk",
        DevelopOptions::new().without_quality().with_checkpoint(true),
        &Collaborators::new(judge.clone()).with_checkpoints(sink.clone()),
    );

    pipeline
        .develop(&Task::from("Add retries"), &mut WorkingMemory::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["spec", "tests"]);
    assert_eq!(sink.named("spec")[0]["spec"], json!(default_prompt(Aspect::Spec)));
}

#[tokio::test]
async fn test_gate_wraps_the_base_action() {
    let judge = Arc::new(ScriptedJudge::new().on_sequence(
        "Score the work",
        vec![json!({"score": 0.3, "feedback": "no tests"}), json!({"score": 0.97})],
    ));
    let base = Arc::new(CountingDevelop::default());
    let pipeline = assemble(
        "package",
        DevelopOptions::new().with_base(base.clone()),
        &collaborators(&judge),
    );
    let mut memory = WorkingMemory::new();

    let work = pipeline
        .develop(&Task::from("Bump serde"), &mut memory)
        .await
        .unwrap();

    assert_eq!(base.calls(), 2);
    let report = work.quality.unwrap();
    assert_eq!(report.verdict, GateVerdict::Accepted);
    assert_eq!(report.attempt, 2);
    assert!(!report.criteria.is_empty());
    assert_eq!(judge.count_matching("Score the work"), 2);
}

#[tokio::test]
async fn test_custom_quality_overrides_domain_budget() {
    let judge = Arc::new(ScriptedJudge::new().on("Score the work", json!({"score": 0.1})));
    let base = Arc::new(CountingDevelop::default());
    let pipeline = assemble(
        "package",
        DevelopOptions::new()
            .with_base(base.clone())
            .with_quality(QualityToggle::with_budget(0.8, 2)),
        &collaborators(&judge),
    );

    let work = pipeline
        .develop(&Task::from("Bump serde"), &mut WorkingMemory::new())
        .await
        .unwrap();

    assert_eq!(base.calls(), 2);
    assert_eq!(work.quality.unwrap().verdict, GateVerdict::BelowThreshold);
}

#[tokio::test]
async fn test_nested_pipeline_keeps_outer_domain() {
    let judge = Arc::new(ScriptedJudge::new());
    let mut memory = WorkingMemory::for_domain("infra");

    let pipeline = assemble(
        "package",
        DevelopOptions::new().without_quality(),
        &collaborators(&judge),
    );
    pipeline
        .develop(&Task::from("Pin versions"), &mut memory)
        .await
        .unwrap();
    pipeline
        .develop(&Task::from("Pin versions"), &mut memory)
        .await
        .unwrap();

    assert_eq!(memory.domain.as_deref(), Some("infra"));
    assert!(memory.domain_aspects.is_some());
}
