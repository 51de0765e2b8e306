//! Domain errors for the devloop pipeline system.

use thiserror::Error;

/// Domain-level errors that can occur while assembling or running pipelines.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required collaborator was not supplied. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external judgment primitive failed.
    #[error("Judge failed: {0}")]
    Judge(String),

    /// Polling or acknowledging the work queue failed.
    #[error("Queue error: {0}")]
    Queue(String),

    /// A queued work item could not be handled.
    #[error("Handler failed: {0}")]
    Handler(String),

    /// An external process could not be run or exited unsuccessfully.
    #[error("Process error: {0}")]
    Process(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error belongs to the configuration class (fatal at build time).
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Process(err.to_string())
    }
}
