//! Domain layer for devloop
//!
//! Task, working memory, aspect and quality models, the domain registry,
//! and the ports the pipeline talks to the outside world through.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
