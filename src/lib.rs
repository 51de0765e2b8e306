//! devloop - quality-gated development pipelines
//!
//! A task is routed to a domain (backend, frontend, infra, ...), run through
//! that domain's ordered preparation stages and finally through a convergence
//! gate that re-develops until a judge scores the work above a threshold or
//! the iteration budget runs out. Queue workers and recurring loops drive the
//! same pipelines from external work.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, the domain registry and the ports
//! - **Service Layer** (`services`): stages, assembler, gate, loops, recipes
//! - **Adapters** (`adapters`): process-backed judge and queue, checkpoint sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, setup
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use devloop::{assemble, Collaborators, DevelopOptions, Task, WorkingMemory};
//!
//! let pipeline = assemble("k8s", DevelopOptions::new(), &Collaborators::new(judge));
//! let work = pipeline.develop(&Task::from("Add readiness probes"), &mut WorkingMemory::new()).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    list_domains, Aspect, Config, DomainKind, GateVerdict, QualityReport, QualityToggle, Task,
    Work, WorkingMemory,
};
pub use domain::ports::{CheckpointSink, Judge, Scorer, WorkQueue};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{assemble, compose, Collaborators, Develop, DevelopOptions, Pipeline, Stage};
