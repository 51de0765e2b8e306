//! Application services
//!
//! Stage composition, the preparation stages, the pipeline assembler, the
//! convergence gate, the two long-lived loops and the recipes built on them.

pub mod assembler;
pub mod pipeline;
pub mod quality_gate;
pub mod queue_worker;
pub mod recipes;
pub mod recurring;
pub mod stages;

pub use assembler::{assemble, Collaborators, DevelopOptions, Pipeline};
pub use pipeline::{compose, Develop, JudgeDevelop, Stage, StageChain};
pub use quality_gate::{JudgeScorer, QualityGate, QualityGateStage};
pub use queue_worker::{QueueWorker, QueueWorkerBuilder, WorkerStatus};
pub use recipes::{
    dev_periodic_maintenance, dev_work_queue_worker, DevRecipes, DevWorkHandler,
    GatedChangeOptions, MaintenanceJob, PlanExecute,
};
pub use recurring::{RecurringLoop, RecurringLoopBuilder, RecurringStatus};
