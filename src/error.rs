//! Error types for Tether

use crate::engine::EngineError;
use thiserror::Error;

/// Result type for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;

/// Tether error types
#[derive(Error, Debug)]
pub enum TetherError {
    /// A service descriptor is self-referential or otherwise invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Container labels could not be decoded into a service
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// The dependency graph is not acyclic
    #[error("Dependency cycle among: {}", nodes.join(", "))]
    DependencyCycle { nodes: Vec<String> },

    /// Discovery found nothing for an application
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// An engine call failed partway through a start/stop sequence
    #[error("Engine operation failed for service {service} (completed: [{}]): {source}", completed.join(", "))]
    EngineOperation {
        service: String,
        completed: Vec<String>,
        source: EngineError,
    },

    /// An engine call failed outside of a start/stop sequence
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TetherError {
    /// Services already processed when an orchestration call halted
    pub fn completed(&self) -> &[String] {
        match self {
            TetherError::EngineOperation { completed, .. } => completed,
            _ => &[],
        }
    }
}
