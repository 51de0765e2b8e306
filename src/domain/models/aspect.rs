//! Aspects: the optional stages that wrap the core production action.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named optional pipeline stage.
///
/// Declaration order is also the ordering used by [`EnabledAspects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Planning,
    Research,
    Spec,
    Tests,
    Security,
    Ops,
    ErrorHandling,
    Performance,
    Docs,
    DataDriven,
    Refactor,
    Git,
}

impl Aspect {
    /// All aspects in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Planning,
        Self::Research,
        Self::Spec,
        Self::Tests,
        Self::Security,
        Self::Ops,
        Self::ErrorHandling,
        Self::Performance,
        Self::Docs,
        Self::DataDriven,
        Self::Refactor,
        Self::Git,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Research => "research",
            Self::Spec => "spec",
            Self::Tests => "tests",
            Self::Security => "security",
            Self::Ops => "ops",
            Self::ErrorHandling => "error_handling",
            Self::Performance => "performance",
            Self::Docs => "docs",
            Self::DataDriven => "data_driven",
            Self::Refactor => "refactor",
            Self::Git => "git",
        }
    }

    /// Parse an aspect name; accepts snake_case and the camelCase spellings.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "planning" | "domain_planning" | "domainplanning" => Some(Self::Planning),
            "research" => Some(Self::Research),
            "spec" => Some(Self::Spec),
            "tests" | "test" => Some(Self::Tests),
            "security" => Some(Self::Security),
            "ops" => Some(Self::Ops),
            "error_handling" | "errorhandling" => Some(Self::ErrorHandling),
            "performance" | "perf" => Some(Self::Performance),
            "docs" => Some(Self::Docs),
            "data_driven" | "datadriven" => Some(Self::DataDriven),
            "refactor" => Some(Self::Refactor),
            "git" => Some(Self::Git),
            _ => None,
        }
    }

    /// Working-memory key the aspect's output is stored under.
    pub const fn memory_key(&self) -> &'static str {
        match self {
            Self::Planning => "domainPlanning",
            Self::Research => "research",
            Self::Spec => "spec",
            Self::Tests => "testPlan",
            Self::Security => "securityReview",
            Self::Ops => "opsNotes",
            Self::ErrorHandling => "errorHandlingNotes",
            Self::Performance => "performanceNotes",
            Self::Docs => "docsPlan",
            Self::DataDriven => "dataNotes",
            Self::Refactor => "refactorGuardrails",
            Self::Git => "gitNotes",
        }
    }

    /// Whether the aspect checkpoints when the pipeline-wide checkpoint flag is set.
    pub const fn inherits_checkpoint(&self) -> bool {
        matches!(
            self,
            Self::Planning | Self::Research | Self::Spec | Self::Tests
        )
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the research stage decides whether to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchMode {
    /// Ask the judge whether research is warranted first.
    #[default]
    Auto,
    Always,
    Never,
}

/// Caller-supplied overrides for one aspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectOverrides {
    pub enabled: Option<bool>,
    pub checkpoint: Option<bool>,
    pub prompt: Option<String>,
    pub mode: Option<ResearchMode>,
    pub checkpoint_name: Option<String>,
}

/// Tri-state feature toggle: disabled, enabled with defaults, or enabled with overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawToggle", into = "RawToggle")]
pub enum AspectToggle {
    Off,
    #[default]
    On,
    Custom(AspectOverrides),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawToggle {
    Flag(bool),
    Overrides(AspectOverrides),
}

impl From<RawToggle> for AspectToggle {
    fn from(raw: RawToggle) -> Self {
        match raw {
            RawToggle::Flag(true) => Self::On,
            RawToggle::Flag(false) => Self::Off,
            RawToggle::Overrides(overrides) => Self::Custom(overrides),
        }
    }
}

impl From<AspectToggle> for RawToggle {
    fn from(toggle: AspectToggle) -> Self {
        match toggle {
            AspectToggle::On => Self::Flag(true),
            AspectToggle::Off => Self::Flag(false),
            AspectToggle::Custom(overrides) => Self::Overrides(overrides),
        }
    }
}

impl From<bool> for AspectToggle {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Defaults an assembler supplies when normalizing a toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AspectDefaults {
    pub checkpoint: bool,
    pub mode: ResearchMode,
    pub checkpoint_name: Option<String>,
}

/// Fully resolved settings for one aspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectSettings {
    pub enabled: bool,
    pub checkpoint: bool,
    pub prompt: Option<String>,
    pub mode: ResearchMode,
    pub checkpoint_name: Option<String>,
}

impl AspectSettings {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Normalize a toggle.
///
/// `Off` collapses to a bare disabled setting, `On` (or an absent toggle) to
/// enabled plus defaults, and `Custom` merges defaults with the overrides.
pub fn normalize_aspect(toggle: Option<&AspectToggle>, defaults: &AspectDefaults) -> AspectSettings {
    let enabled_with_defaults = || AspectSettings {
        enabled: true,
        checkpoint: defaults.checkpoint,
        prompt: None,
        mode: defaults.mode,
        checkpoint_name: defaults.checkpoint_name.clone(),
    };

    match toggle {
        Some(AspectToggle::Off) => AspectSettings::disabled(),
        None | Some(AspectToggle::On) => enabled_with_defaults(),
        Some(AspectToggle::Custom(overrides)) => AspectSettings {
            enabled: overrides.enabled.unwrap_or(true),
            checkpoint: overrides.checkpoint.unwrap_or(defaults.checkpoint),
            prompt: overrides.prompt.clone(),
            mode: overrides.mode.unwrap_or(defaults.mode),
            checkpoint_name: overrides
                .checkpoint_name
                .clone()
                .or_else(|| defaults.checkpoint_name.clone()),
        },
    }
}

/// Which aspects are active for one pipeline build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnabledAspects(BTreeMap<Aspect, bool>);

impl EnabledAspects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, aspect: Aspect, enabled: bool) {
        self.0.insert(aspect, enabled);
    }

    /// True only for aspects the domain accepts and that were enabled.
    pub fn is_enabled(&self, aspect: Aspect) -> bool {
        self.0.get(&aspect).copied().unwrap_or(false)
    }

    /// Aspects considered by the build, enabled or not.
    pub fn declared(&self) -> impl Iterator<Item = (Aspect, bool)> + '_ {
        self.0.iter().map(|(aspect, enabled)| (*aspect, *enabled))
    }

    pub fn enabled(&self) -> impl Iterator<Item = Aspect> + '_ {
        self.declared()
            .filter_map(|(aspect, enabled)| enabled.then_some(aspect))
    }
}

impl FromIterator<(Aspect, bool)> for EnabledAspects {
    fn from_iter<I: IntoIterator<Item = (Aspect, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
