pub mod aspect;
pub mod config;
pub mod criteria;
pub mod domain_kind;
pub mod memory;
pub mod planning;
pub mod quality;
pub mod queue;
pub mod task;
pub mod work;

pub use aspect::{
    normalize_aspect, Aspect, AspectDefaults, AspectOverrides, AspectSettings, AspectToggle,
    EnabledAspects, ResearchMode,
};
pub use config::{
    CheckpointConfig, Config, JudgeConfig, LoggingConfig, MaintenanceConfig, QualitySettings,
    QueueConfig, WorkerConfig,
};
pub use criteria::{CriteriaFamily, DomainCriteria};
pub use domain_kind::{list_domains, DomainKind, DomainProfile};
pub use memory::WorkingMemory;
pub use planning::{planning_pack, PackRegistry, PlanningPack};
pub use quality::{
    normalize_quality, CriteriaBuilder, CriteriaSource, GateVerdict, QualityConfig,
    QualityOverrides, QualityReport, QualityToggle, ScoreCard,
};
pub use queue::QueueItem;
pub use task::{NormalizedTask, Task};
pub use work::Work;
