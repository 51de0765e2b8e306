//! Pipeline assembler: domain name plus toggles in, develop action out.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    normalize_aspect, normalize_quality, Aspect, AspectDefaults, AspectToggle, CriteriaSource,
    DomainCriteria, DomainKind, EnabledAspects, QualityConfig, QualityToggle, Task, Work,
    WorkingMemory,
};
use crate::domain::ports::{CheckpointSink, Judge, NullCheckpointSink, Scorer};
use crate::services::pipeline::{compose, Develop, JudgeDevelop, Stage};
use crate::services::quality_gate::{JudgeScorer, QualityGate, QualityGateStage};
use crate::services::stages::research::{RESEARCH_CHECKPOINT, RESEARCH_NO_CHECKPOINT};
use crate::services::stages::{DomainContextStage, DomainPlanningStage, ResearchStage, ReviewStage};

/// Per-build options.
#[derive(Clone, Default)]
pub struct DevelopOptions {
    /// Production action; defaults to asking the judge with the task prompt.
    pub base: Option<Arc<dyn Develop>>,
    /// Pipeline-wide checkpoint flag inherited by planning, research, spec and tests.
    pub checkpoint: bool,
    pub aspects: BTreeMap<Aspect, AspectToggle>,
    pub quality: Option<QualityToggle>,
}

impl DevelopOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: Arc<dyn Develop>) -> Self {
        self.base = Some(base);
        self
    }

    pub const fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_aspect(mut self, aspect: Aspect, toggle: impl Into<AspectToggle>) -> Self {
        self.aspects.insert(aspect, toggle.into());
        self
    }

    pub fn with_quality(mut self, quality: QualityToggle) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn without_quality(self) -> Self {
        self.with_quality(QualityToggle::Off)
    }
}

/// External collaborators every stage of a build shares.
#[derive(Clone)]
pub struct Collaborators {
    pub judge: Arc<dyn Judge>,
    pub scorer: Arc<dyn Scorer>,
    pub checkpoints: Arc<dyn CheckpointSink>,
}

impl Collaborators {
    /// Judge-backed scoring, no checkpoints.
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            scorer: Arc::new(JudgeScorer::new(judge.clone())),
            judge,
            checkpoints: Arc::new(NullCheckpointSink),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<dyn CheckpointSink>) -> Self {
        self.checkpoints = checkpoints;
        self
    }
}

/// An assembled develop action plus what went into it.
pub struct Pipeline {
    domain: DomainKind,
    enabled: EnabledAspects,
    quality: QualityConfig,
    develop: Arc<dyn Develop>,
}

impl Pipeline {
    pub const fn domain(&self) -> DomainKind {
        self.domain
    }

    pub const fn enabled(&self) -> &EnabledAspects {
        &self.enabled
    }

    pub const fn quality(&self) -> &QualityConfig {
        &self.quality
    }

    /// The composed action, for nesting inside other pipelines.
    pub fn develop_action(&self) -> Arc<dyn Develop> {
        self.develop.clone()
    }
}

#[async_trait]
impl Develop for Pipeline {
    #[instrument(skip_all, fields(domain = %self.domain))]
    async fn develop(&self, task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work> {
        self.develop.develop(task, memory).await
    }
}

/// Assemble the pipeline for `domain_name`.
///
/// Unknown domain names fall back to backend. Toggles for aspects the domain
/// does not run are ignored.
pub fn assemble(domain_name: &str, options: DevelopOptions, collaborators: &Collaborators) -> Pipeline {
    let domain = DomainKind::normalize(domain_name);
    let profile = domain.profile();

    let settings: Vec<_> = profile
        .stages
        .iter()
        .map(|aspect| {
            let defaults = AspectDefaults {
                checkpoint: options.checkpoint && aspect.inherits_checkpoint(),
                checkpoint_name: (*aspect == Aspect::Research).then(|| {
                    if options.checkpoint {
                        RESEARCH_CHECKPOINT.to_string()
                    } else {
                        RESEARCH_NO_CHECKPOINT.to_string()
                    }
                }),
                ..AspectDefaults::default()
            };
            (*aspect, normalize_aspect(options.aspects.get(aspect), &defaults))
        })
        .collect();

    let enabled: EnabledAspects = settings
        .iter()
        .map(|(aspect, settings)| (*aspect, settings.enabled))
        .collect();

    let quality = normalize_quality(
        options.quality.as_ref(),
        profile.threshold,
        profile.max_iters,
        CriteriaSource::Builder(Arc::new(DomainCriteria::new(
            profile.criteria,
            enabled.clone(),
        ))),
    );

    let judge = &collaborators.judge;
    let checkpoints = &collaborators.checkpoints;

    let mut stages: Vec<Option<Arc<dyn Stage>>> = Vec::with_capacity(settings.len() + 2);
    stages.push(Some(Arc::new(DomainContextStage::new(domain, enabled.clone()))));
    for (aspect, settings) in &settings {
        if !settings.enabled {
            continue;
        }
        let stage: Arc<dyn Stage> = match aspect {
            Aspect::Planning => Arc::new(DomainPlanningStage::from_settings(
                domain,
                settings,
                judge.clone(),
                checkpoints.clone(),
            )),
            Aspect::Research => Arc::new(ResearchStage::from_settings(
                settings,
                judge.clone(),
                checkpoints.clone(),
            )),
            other => Arc::new(ReviewStage::from_settings(
                *other,
                settings,
                judge.clone(),
                checkpoints.clone(),
            )),
        };
        stages.push(Some(stage));
    }
    stages.push(
        QualityGate::from_config(&quality, collaborators.scorer.clone(), checkpoints.clone())
            .map(|gate| Arc::new(QualityGateStage::new(gate)) as Arc<dyn Stage>),
    );

    debug!(
        domain = %domain,
        stages = ?enabled.enabled().collect::<Vec<_>>(),
        quality = quality.is_enabled(),
        "pipeline assembled"
    );

    let base = options
        .base
        .unwrap_or_else(|| Arc::new(JudgeDevelop::new(judge.clone())));

    Pipeline {
        domain,
        enabled,
        quality,
        develop: compose(base, stages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use serde_json::Value;

    struct Silent;

    #[async_trait]
    impl Judge for Silent {
        async fn judge(&self, _prompt: &str, _context: Value) -> DomainResult<Value> {
            Err(DomainError::Judge("not used".into()))
        }
    }

    fn collaborators() -> Collaborators {
        Collaborators::new(Arc::new(Silent))
    }

    #[test]
    fn test_unaccepted_aspect_is_ignored() {
        let pipeline = assemble(
            "workers",
            DevelopOptions::new().with_aspect(Aspect::Docs, true),
            &collaborators(),
        );
        assert_eq!(pipeline.domain(), DomainKind::Workers);
        assert!(!pipeline.enabled().is_enabled(Aspect::Docs));
        assert!(pipeline.enabled().is_enabled(Aspect::Ops));
    }

    #[test]
    fn test_disabled_aspect_is_declared_false() {
        let pipeline = assemble(
            "sdk",
            DevelopOptions::new().with_aspect(Aspect::Refactor, false),
            &collaborators(),
        );
        let declared: Vec<_> = pipeline.enabled().declared().collect();
        assert!(declared.contains(&(Aspect::Refactor, false)));
        assert!(declared.contains(&(Aspect::Docs, true)));
    }

    #[test]
    fn test_quality_defaults_follow_domain() {
        let pipeline = assemble("go", DevelopOptions::new(), &collaborators());
        match pipeline.quality() {
            QualityConfig::Enabled {
                threshold,
                max_iters,
                ..
            } => {
                assert!((threshold - 0.92).abs() < f64::EPSILON);
                assert_eq!(*max_iters, 5);
            }
            QualityConfig::Disabled => panic!("gate should be on"),
        }
        let off = assemble("go", DevelopOptions::new().without_quality(), &collaborators());
        assert!(!off.quality().is_enabled());
    }
}
