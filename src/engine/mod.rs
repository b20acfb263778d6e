//! Container engine interface
//!
//! The orchestrator only needs four engine operations: list containers by
//! label, create, start and stop. [`ContainerEngine`] is that seam;
//! [`MemoryEngine`] implements it in-process and [`DockerEngine`] talks to a
//! Docker-compatible HTTP API.

pub mod docker;
pub mod memory;

pub use docker::DockerEngine;
pub use memory::{EngineCall, MemoryEngine};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No such container: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid container state: {0}")]
    InvalidState(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Lock error: {0}")]
    Lock(String),
}

/// Container state as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created but never started
    Created,
    /// Running
    Running,
    /// Paused
    Paused,
    /// Restarting
    Restarting,
    /// Stopped
    Exited,
    /// Being removed
    Removing,
    /// Failed to stop or remove
    Dead,
    /// Anything this client does not know about
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Whether the container is up
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running | ContainerState::Restarting)
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Paused => write!(f, "paused"),
            ContainerState::Restarting => write!(f, "restarting"),
            ContainerState::Exited => write!(f, "exited"),
            ContainerState::Removing => write!(f, "removing"),
            ContainerState::Dead => write!(f, "dead"),
            ContainerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reference to an engine container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Engine container ID
    pub id: String,
    /// Container name
    pub name: String,
}

/// One entry of a container listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub state: ContainerState,
}

impl ContainerSummary {
    /// Handle for later engine calls
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Parameters for creating a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Image, when the engine needs one
    pub image: Option<String>,
    /// Labels to attach
    pub labels: HashMap<String, String>,
    /// Links as `name:alias`
    pub links: Vec<String>,
    /// Containers to mount volumes from
    pub volumes_from: Vec<String>,
    /// Network mode string (`bridge`, `none`, `host`, `container:<name>`)
    pub network_mode: String,
}

/// Operations consumed from a container engine.
///
/// Every call is awaited before the next is issued; implementations need
/// not be reentrant beyond `Send + Sync`.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List containers carrying every label in `label_filters`.
    ///
    /// Filters are `key=value` (exact match) or `key` (label present).
    /// Stopped containers are included only when `all` is set.
    async fn list_containers(
        &self,
        all: bool,
        label_filters: &[String],
    ) -> EngineResult<Vec<ContainerSummary>>;

    /// Create a container
    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<ContainerHandle>;

    /// Start a container; starting a running container is a no-op
    async fn start_container(&self, handle: &ContainerHandle) -> EngineResult<()>;

    /// Stop a container; stopping a stopped container is a no-op
    async fn stop_container(&self, handle: &ContainerHandle) -> EngineResult<()>;
}

/// Whether `labels` satisfy every filter
pub fn matches_filters(labels: &HashMap<String, String>, filters: &[String]) -> bool {
    filters.iter().all(|filter| match filter.split_once('=') {
        Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
        None => labels.contains_key(filter.as_str()),
    })
}
