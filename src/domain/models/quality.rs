//! Quality gate configuration and outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::memory::WorkingMemory;
use super::task::Task;

/// Computes the acceptance criteria for a task.
///
/// Called once per gate invocation.
pub trait CriteriaBuilder: Send + Sync {
    fn build(&self, task: &Task, memory: &WorkingMemory) -> Vec<String>;
}

/// Where a gate gets its criteria from.
#[derive(Clone)]
pub enum CriteriaSource {
    Static(Vec<String>),
    Builder(Arc<dyn CriteriaBuilder>),
}

impl CriteriaSource {
    pub fn resolve(&self, task: &Task, memory: &WorkingMemory) -> Vec<String> {
        match self {
            Self::Static(criteria) => criteria.clone(),
            Self::Builder(builder) => builder.build(task, memory),
        }
    }
}

impl fmt::Debug for CriteriaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(criteria) => f.debug_tuple("Static").field(criteria).finish(),
            Self::Builder(_) => f.write_str("Builder(..)"),
        }
    }
}

/// Caller overrides for the quality gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOverrides {
    pub enabled: Option<bool>,
    pub threshold: Option<f64>,
    pub max_iters: Option<u32>,
    pub criteria: Option<Vec<String>>,
}

/// Tri-state quality toggle, mirroring [`super::aspect::AspectToggle`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawQuality", into = "RawQuality")]
pub enum QualityToggle {
    Off,
    #[default]
    On,
    Custom(QualityOverrides),
}

impl QualityToggle {
    pub fn with_budget(threshold: f64, max_iters: u32) -> Self {
        Self::Custom(QualityOverrides {
            threshold: Some(threshold),
            max_iters: Some(max_iters),
            ..Default::default()
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawQuality {
    Flag(bool),
    Overrides(QualityOverrides),
}

impl From<RawQuality> for QualityToggle {
    fn from(raw: RawQuality) -> Self {
        match raw {
            RawQuality::Flag(true) => Self::On,
            RawQuality::Flag(false) => Self::Off,
            RawQuality::Overrides(overrides) => Self::Custom(overrides),
        }
    }
}

impl From<QualityToggle> for RawQuality {
    fn from(toggle: QualityToggle) -> Self {
        match toggle {
            QualityToggle::On => Self::Flag(true),
            QualityToggle::Off => Self::Flag(false),
            QualityToggle::Custom(overrides) => Self::Overrides(overrides),
        }
    }
}

/// Resolved gate configuration.
#[derive(Debug, Clone)]
pub enum QualityConfig {
    Disabled,
    Enabled {
        threshold: f64,
        max_iters: u32,
        criteria: CriteriaSource,
    },
}

impl QualityConfig {
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

/// Normalize a quality toggle against domain defaults.
///
/// A non-positive threshold disables the gate. Thresholds above 1 are clamped
/// to 1 and an iteration budget of 0 is raised to 1.
pub fn normalize_quality(
    toggle: Option<&QualityToggle>,
    default_threshold: f64,
    default_max_iters: u32,
    default_criteria: CriteriaSource,
) -> QualityConfig {
    let (threshold, max_iters, criteria) = match toggle {
        Some(QualityToggle::Off) => return QualityConfig::Disabled,
        None | Some(QualityToggle::On) => (default_threshold, default_max_iters, default_criteria),
        Some(QualityToggle::Custom(overrides)) => {
            if overrides.enabled == Some(false) {
                return QualityConfig::Disabled;
            }
            (
                overrides.threshold.unwrap_or(default_threshold),
                overrides.max_iters.unwrap_or(default_max_iters),
                overrides
                    .criteria
                    .clone()
                    .map_or(default_criteria, CriteriaSource::Static),
            )
        }
    };

    if threshold.is_nan() || threshold <= 0.0 {
        return QualityConfig::Disabled;
    }

    QualityConfig::Enabled {
        threshold: threshold.min(1.0),
        max_iters: max_iters.max(1),
        criteria,
    }
}

/// A judge's assessment of one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Normalized score in `[0, 1]`; `None` when the judge gave no number.
    pub score: Option<f64>,
    pub feedback: Option<Value>,
}

impl ScoreCard {
    pub fn new(score: f64) -> Self {
        Self {
            score: Some(score.clamp(0.0, 1.0)),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Value) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Coerce an arbitrary judge response.
    ///
    /// Accepts a bare number or an object carrying `reward_total`,
    /// `rewardTotal` or `score`, optionally nested under `scoreCard`.
    pub fn from_response(response: &Value) -> Self {
        let score = match response {
            Value::Number(number) => number.as_f64(),
            Value::Object(map) => {
                let card = map
                    .get("scoreCard")
                    .or_else(|| map.get("scorecard"))
                    .unwrap_or(response);
                ["reward_total", "rewardTotal", "score"]
                    .iter()
                    .find_map(|key| card.get(*key).and_then(Value::as_f64))
            }
            _ => None,
        };

        let feedback = match response {
            Value::Object(map) => ["feedback", "notes", "gaps"]
                .iter()
                .find_map(|key| map.get(*key).cloned())
                .or_else(|| Some(response.clone())),
            Value::Null | Value::Number(_) => None,
            other => Some(other.clone()),
        };

        Self {
            score: score.map(|s| s.clamp(0.0, 1.0)),
            feedback,
        }
    }

    /// The score the gate acts on; missing scores count as zero.
    pub fn effective_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Terminal state of a gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    Accepted,
    BelowThreshold,
}

/// Quality metadata attached to gated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub verdict: GateVerdict,
    pub score: f64,
    /// Attempt that produced the returned candidate.
    pub attempt: u32,
    /// Total attempts made.
    pub attempts: u32,
    pub threshold: f64,
    pub criteria: Vec<String>,
    pub feedback: Option<Value>,
}

impl QualityReport {
    pub fn is_accepted(&self) -> bool {
        self.verdict == GateVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criteria() -> CriteriaSource {
        CriteriaSource::Static(vec!["correct".to_string()])
    }

    #[test]
    fn test_zero_threshold_disables_gate() {
        let toggle = QualityToggle::Custom(QualityOverrides {
            threshold: Some(0.0),
            ..Default::default()
        });
        assert!(!normalize_quality(Some(&toggle), 0.9, 5, criteria()).is_enabled());
    }

    #[test]
    fn test_absent_uses_defaults() {
        match normalize_quality(None, 0.9, 4, criteria()) {
            QualityConfig::Enabled {
                threshold,
                max_iters,
                ..
            } => {
                assert!((threshold - 0.9).abs() < f64::EPSILON);
                assert_eq!(max_iters, 4);
            }
            QualityConfig::Disabled => panic!("expected enabled gate"),
        }
    }

    #[test]
    fn test_zero_iterations_clamped() {
        let toggle = QualityToggle::with_budget(0.8, 0);
        match normalize_quality(Some(&toggle), 0.9, 5, criteria()) {
            QualityConfig::Enabled { max_iters, .. } => assert_eq!(max_iters, 1),
            QualityConfig::Disabled => panic!("expected enabled gate"),
        }
    }

    #[test]
    fn test_static_criteria_override() {
        let toggle = QualityToggle::Custom(QualityOverrides {
            criteria: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        });
        match normalize_quality(Some(&toggle), 0.9, 5, criteria()) {
            QualityConfig::Enabled {
                criteria: CriteriaSource::Static(list),
                ..
            } => assert_eq!(list, vec!["a", "b"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_score_card_coercion() {
        assert_eq!(ScoreCard::from_response(&json!(0.7)).score, Some(0.7));
        let nested = json!({"scoreCard": {"reward_total": 0.95}, "feedback": "tighten tests"});
        let card = ScoreCard::from_response(&nested);
        assert_eq!(card.score, Some(0.95));
        assert_eq!(card.feedback, Some(json!("tighten tests")));
        assert_eq!(ScoreCard::from_response(&json!("great")).score, None);
        assert_eq!(ScoreCard::from_response(&json!({"score": 3.0})).score, Some(1.0));
    }
}
