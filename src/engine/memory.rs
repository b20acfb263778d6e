//! In-process container engine
//!
//! Keeps containers in a table instead of running them. It enforces the
//! same ordering rules a real engine does (a container can only start once
//! the containers it links to, mounts from or shares a network with are
//! present and, for links and networks, running), records every call, and
//! can be told to fail specific operations.

use super::{
    matches_filters, ContainerEngine, ContainerHandle, ContainerSpec, ContainerState,
    ContainerSummary, EngineError, EngineResult,
};
use crate::service::net::CONTAINER_PREFIX;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use uuid::Uuid;

/// A call received by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    List,
    Create(String),
    Start(String),
    Stop(String),
}

/// Operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operation {
    Create,
    Start,
    Stop,
}

/// Container record
#[derive(Debug, Clone)]
struct MemoryContainer {
    id: String,
    spec: ContainerSpec,
    state: ContainerState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl MemoryContainer {
    fn new(spec: ContainerSpec) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string()[..12].to_string(),
            spec,
            state: ContainerState::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: self.id.clone(),
            name: self.spec.name.clone(),
            labels: self.spec.labels.clone(),
            state: self.state,
        }
    }

    fn start(&mut self) {
        if self.state != ContainerState::Running {
            self.state = ContainerState::Running;
            self.started_at = Some(Utc::now());
        }
    }

    fn stop(&mut self) {
        if self.state == ContainerState::Running {
            self.state = ContainerState::Exited;
            self.finished_at = Some(Utc::now());
        }
    }
}

/// In-memory engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    /// All containers indexed by ID
    containers: RwLock<HashMap<String, MemoryContainer>>,
    /// Operations that fail for a container name
    failures: RwLock<HashSet<(Operation, String)>>,
    /// Every call, in arrival order
    journal: RwLock<Vec<EngineCall>>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creating the named container fail
    pub fn fail_on_create(&self, name: &str) {
        self.inject(Operation::Create, name);
    }

    /// Make starting the named container fail
    pub fn fail_on_start(&self, name: &str) {
        self.inject(Operation::Start, name);
    }

    /// Make stopping the named container fail
    pub fn fail_on_stop(&self, name: &str) {
        self.inject(Operation::Stop, name);
    }

    fn inject(&self, operation: Operation, name: &str) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert((operation, name.to_string()));
        }
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.read().map(|j| j.clone()).unwrap_or_default()
    }

    /// Names of containers started, in order
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Start(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names of containers stopped, in order
    pub fn stopped(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Stop(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// State of the named container
    pub fn state(&self, name: &str) -> Option<ContainerState> {
        let containers = self.containers.read().ok()?;
        containers
            .values()
            .find(|c| c.spec.name == name)
            .map(|c| c.state)
    }

    /// Spec the named container was created with
    pub fn spec(&self, name: &str) -> Option<ContainerSpec> {
        let containers = self.containers.read().ok()?;
        containers
            .values()
            .find(|c| c.spec.name == name)
            .map(|c| c.spec.clone())
    }

    /// Number of containers
    pub fn count(&self) -> usize {
        self.containers.read().map(|c| c.len()).unwrap_or(0)
    }

    fn record(&self, call: EngineCall) -> EngineResult<()> {
        self.journal
            .write()
            .map_err(|_| EngineError::Lock("Failed to acquire journal lock".to_string()))?
            .push(call);
        Ok(())
    }

    fn check_failure(&self, operation: Operation, name: &str) -> EngineResult<()> {
        let failures = self
            .failures
            .read()
            .map_err(|_| EngineError::Lock("Failed to acquire read lock".to_string()))?;

        if failures.contains(&(operation, name.to_string())) {
            return Err(EngineError::Api {
                status: 500,
                message: format!("injected {:?} failure for {}", operation, name),
            });
        }
        Ok(())
    }
}

/// Check that everything `spec` depends on is in place
fn check_dependencies(
    spec: &ContainerSpec,
    containers: &HashMap<String, MemoryContainer>,
) -> EngineResult<()> {
    let find = |name: &str| containers.values().find(|c| c.spec.name == name);

    for link in &spec.links {
        let target = link.split(':').next().unwrap_or(link);
        match find(target) {
            Some(c) if c.state.is_running() => {}
            Some(_) => {
                return Err(EngineError::InvalidState(format!(
                    "cannot link to a non running container: {}",
                    target
                )))
            }
            None => return Err(EngineError::NotFound(target.to_string())),
        }
    }

    for volume in &spec.volumes_from {
        if find(volume).is_none() {
            return Err(EngineError::NotFound(volume.clone()));
        }
    }

    if let Some(other) = spec.network_mode.strip_prefix(CONTAINER_PREFIX) {
        match find(other) {
            Some(c) if c.state.is_running() => {}
            Some(_) => {
                return Err(EngineError::InvalidState(format!(
                    "cannot join network of a non running container: {}",
                    other
                )))
            }
            None => return Err(EngineError::NotFound(other.to_string())),
        }
    }

    Ok(())
}

#[async_trait]
impl ContainerEngine for MemoryEngine {
    async fn list_containers(
        &self,
        all: bool,
        label_filters: &[String],
    ) -> EngineResult<Vec<ContainerSummary>> {
        self.record(EngineCall::List)?;

        let containers = self
            .containers
            .read()
            .map_err(|_| EngineError::Lock("Failed to acquire read lock".to_string()))?;

        let mut result: Vec<ContainerSummary> = containers
            .values()
            .filter(|c| all || c.state.is_running())
            .filter(|c| matches_filters(&c.spec.labels, label_filters))
            .map(MemoryContainer::summary)
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<ContainerHandle> {
        self.record(EngineCall::Create(spec.name.clone()))?;
        self.check_failure(Operation::Create, &spec.name)?;

        let mut containers = self
            .containers
            .write()
            .map_err(|_| EngineError::Lock("Failed to acquire write lock".to_string()))?;

        if containers.values().any(|c| c.spec.name == spec.name) {
            return Err(EngineError::Conflict(format!(
                "container name {} is already in use",
                spec.name
            )));
        }

        let container = MemoryContainer::new(spec.clone());
        let handle = ContainerHandle {
            id: container.id.clone(),
            name: spec.name.clone(),
        };
        tracing::debug!(
            "Created container {} ({}) at {}",
            handle.name,
            handle.id,
            container.created_at
        );
        containers.insert(container.id.clone(), container);
        Ok(handle)
    }

    async fn start_container(&self, handle: &ContainerHandle) -> EngineResult<()> {
        self.record(EngineCall::Start(handle.name.clone()))?;
        self.check_failure(Operation::Start, &handle.name)?;

        let mut containers = self
            .containers
            .write()
            .map_err(|_| EngineError::Lock("Failed to acquire write lock".to_string()))?;

        let spec = containers
            .get(&handle.id)
            .map(|c| c.spec.clone())
            .ok_or_else(|| EngineError::NotFound(handle.id.clone()))?;
        check_dependencies(&spec, &containers)?;

        if let Some(container) = containers.get_mut(&handle.id) {
            container.start();
            if let Some(started) = container.started_at {
                tracing::debug!("Started container {} at {}", handle.name, started);
            }
        }
        Ok(())
    }

    async fn stop_container(&self, handle: &ContainerHandle) -> EngineResult<()> {
        self.record(EngineCall::Stop(handle.name.clone()))?;
        self.check_failure(Operation::Stop, &handle.name)?;

        let mut containers = self
            .containers
            .write()
            .map_err(|_| EngineError::Lock("Failed to acquire write lock".to_string()))?;

        let container = containers
            .get_mut(&handle.id)
            .ok_or_else(|| EngineError::NotFound(handle.id.clone()))?;
        container.stop();
        if let Some(finished) = container.finished_at {
            tracing::debug!("Stopped container {} at {}", handle.name, finished);
        }
        Ok(())
    }
}
