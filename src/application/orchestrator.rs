//! Application orchestrator

use super::snapshot::Snapshot;
use crate::engine::{ContainerEngine, ContainerSpec, ContainerSummary, EngineResult};
use crate::error::{Result, TetherError};
use crate::graph::{order, DependencyGraph};
use crate::service::descriptor::validate_name;
use crate::service::{LabelCodec, Service};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Services processed by a start or stop call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Services acted on, in order
    pub completed: Vec<String>,
    /// Services with no container to act on
    pub skipped: Vec<String>,
}

/// Observed state of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Service name
    pub name: String,
    /// The service's container, if one exists
    pub container: Option<ContainerSummary>,
}

impl ServiceStatus {
    /// Whether the service's container is up
    pub fn is_running(&self) -> bool {
        self.container
            .as_ref()
            .map(|c| c.state.is_running())
            .unwrap_or(false)
    }
}

/// A named, linked set of services.
///
/// The service map belongs to this instance alone. An application never
/// holds an engine; each engine-facing call borrows one.
#[derive(Debug, Clone)]
pub struct Application {
    /// Application name, used as the label filter key
    name: String,
    /// Services keyed by name
    services: BTreeMap<String, Service>,
}

impl Application {
    /// Create an application with no services
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            services: BTreeMap::new(),
        }
    }

    /// Create an application from a collection of services
    pub fn with_services<I>(name: &str, services: I) -> Result<Self>
    where
        I: IntoIterator<Item = Service>,
    {
        validate_name("application", name)?;

        let mut app = Self::new(name);
        for service in services {
            app.add_service(service)?;
        }
        Ok(app)
    }

    /// Rebuild an application from the labels of its containers.
    ///
    /// The container list is fetched once; the returned application is a
    /// snapshot of it. Use [`Snapshot::fetch`] with
    /// [`Application::from_snapshot`] to reuse that listing for a following
    /// [`Application::start_in`] or [`Application::stop_in`].
    pub async fn from_engine<E>(name: &str, engine: &E) -> Result<Self>
    where
        E: ContainerEngine + ?Sized,
    {
        validate_name("application", name)?;
        let snapshot = Snapshot::fetch(name, engine).await?;
        Self::from_snapshot(&snapshot)
    }

    /// Rebuild an application from an existing container listing
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let name = snapshot.app_name();
        validate_name("application", name)?;

        if snapshot.is_empty() {
            return Err(TetherError::Lookup(format!(
                "no containers found for application '{}'",
                name
            )));
        }

        let mut app = Self::new(name);
        for container in snapshot.containers() {
            let service = LabelCodec::decode(&container.labels)?;
            if app.services.contains_key(&service.name) {
                tracing::warn!(
                    "Ignoring container {} ({}): service {} already discovered",
                    container.name,
                    container.id,
                    service.name
                );
                continue;
            }
            app.add_service(service)?;
        }

        tracing::info!(
            "Discovered application {} with {} services",
            name,
            app.services.len()
        );
        Ok(app)
    }

    /// Load an application from a compose file
    pub fn from_file(name: &str, path: &Path) -> Result<Self> {
        Err(TetherError::NotImplemented(format!(
            "loading application '{}' from compose file {}",
            name,
            path.display()
        )))
    }

    /// Application name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Services, sorted by name
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Look up a service
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Number of services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the application has no services
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Add a service, replacing any service of the same name
    pub fn add_service(&mut self, service: Service) -> Result<()> {
        service.validate()?;
        if service.app_name != self.name {
            return Err(TetherError::Configuration(format!(
                "service '{}' belongs to application '{}', not '{}'",
                service.name, service.app_name, self.name
            )));
        }

        self.services.insert(service.name.clone(), service);
        Ok(())
    }

    /// Dependency graph over the services, including external references
    pub fn graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::build(self.services.values())
    }

    /// Containers depended on that this application does not manage
    pub fn external_dependencies(&self) -> Result<Vec<String>> {
        Ok(self.graph()?.external())
    }

    /// Order in which services are started, or stopped when `reverse` is set
    pub fn topology(&self, reverse: bool) -> Result<Vec<String>> {
        order::topology(&self.graph()?, reverse)
    }

    /// Start every service in dependency order.
    ///
    /// Containers missing from the engine are created first. Stops at the
    /// first engine failure and reports the services started before it.
    pub async fn start<E>(&self, engine: &E) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let order = self.checked_order(false)?;
        let snapshot = Snapshot::fetch(&self.name, engine).await?;
        self.start_ordered(engine, order, &snapshot).await
    }

    /// Like [`Application::start`], deciding create or reuse from `snapshot`
    /// instead of listing containers again
    pub async fn start_in<E>(&self, engine: &E, snapshot: &Snapshot) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let order = self.checked_order(false)?;
        self.start_ordered(engine, order, snapshot).await
    }

    async fn start_ordered<E>(
        &self,
        engine: &E,
        order: Vec<String>,
        snapshot: &Snapshot,
    ) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let specs = self
            .services
            .values()
            .map(|s| container_spec(s).map(|spec| (s.name.clone(), spec)))
            .collect::<Result<HashMap<_, _>>>()?;
        let existing = snapshot.by_service();

        tracing::info!("Starting application {}", self.name);

        let mut progress = Progress::default();
        for name in order {
            let Some(spec) = specs.get(&name) else {
                continue;
            };

            let container = existing.get(name.as_str()).copied();
            if let Err(source) = ensure_started(engine, spec, container).await {
                tracing::warn!("Failed to start service {}: {}", name, source);
                return Err(TetherError::EngineOperation {
                    service: name,
                    completed: progress.completed,
                    source,
                });
            }

            tracing::info!("Started service {}", name);
            progress.completed.push(name);
        }

        Ok(progress)
    }

    /// Stop every service in reverse dependency order.
    ///
    /// Services without a container are skipped. Stops at the first engine
    /// failure and reports the services stopped before it.
    pub async fn stop<E>(&self, engine: &E) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let order = self.checked_order(true)?;
        let snapshot = Snapshot::fetch(&self.name, engine).await?;
        self.stop_ordered(engine, order, &snapshot).await
    }

    /// Like [`Application::stop`], taking containers from `snapshot`
    /// instead of listing them again
    pub async fn stop_in<E>(&self, engine: &E, snapshot: &Snapshot) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let order = self.checked_order(true)?;
        self.stop_ordered(engine, order, snapshot).await
    }

    async fn stop_ordered<E>(
        &self,
        engine: &E,
        order: Vec<String>,
        snapshot: &Snapshot,
    ) -> Result<Progress>
    where
        E: ContainerEngine + ?Sized,
    {
        let existing = snapshot.by_service();

        tracing::info!("Stopping application {}", self.name);

        let mut progress = Progress::default();
        for name in order {
            let Some(container) = existing.get(name.as_str()) else {
                tracing::warn!("Service {} has no container, skipping", name);
                progress.skipped.push(name);
                continue;
            };

            if let Err(source) = engine.stop_container(&container.handle()).await {
                tracing::warn!("Failed to stop service {}: {}", name, source);
                return Err(TetherError::EngineOperation {
                    service: name,
                    completed: progress.completed,
                    source,
                });
            }

            tracing::info!("Stopped service {}", name);
            progress.completed.push(name);
        }

        Ok(progress)
    }

    /// State of each service's container, in start order
    pub async fn status<E>(&self, engine: &E) -> Result<Vec<ServiceStatus>>
    where
        E: ContainerEngine + ?Sized,
    {
        let snapshot = Snapshot::fetch(&self.name, engine).await?;
        self.status_in(&snapshot)
    }

    /// State of each service's container as recorded in `snapshot`
    pub fn status_in(&self, snapshot: &Snapshot) -> Result<Vec<ServiceStatus>> {
        let order = self.topology(false)?;
        let existing = snapshot.by_service();

        Ok(order
            .into_iter()
            .map(|name| ServiceStatus {
                container: existing.get(name.as_str()).map(|c| (*c).clone()),
                name,
            })
            .collect())
    }

    /// Actionable order, validated before any engine call
    fn checked_order(&self, reverse: bool) -> Result<Vec<String>> {
        if self.services.is_empty() {
            return Err(TetherError::Lookup(format!(
                "application '{}' has no services",
                self.name
            )));
        }

        let graph = self.graph()?;
        for external in graph.external() {
            tracing::debug!(
                "Application {} depends on unmanaged container {}",
                self.name,
                external
            );
        }
        order::topology(&graph, reverse)
    }
}

/// Creation parameters for a service's container
fn container_spec(service: &Service) -> Result<ContainerSpec> {
    Ok(ContainerSpec {
        name: service.name.clone(),
        image: service.image.clone(),
        labels: LabelCodec::encode(service)?,
        links: service.link_specs(),
        volumes_from: service.volumes_from.clone(),
        network_mode: service.net.mode(),
    })
}

/// Create the container if it does not exist yet, then start it
async fn ensure_started<E>(
    engine: &E,
    spec: &ContainerSpec,
    existing: Option<&ContainerSummary>,
) -> EngineResult<()>
where
    E: ContainerEngine + ?Sized,
{
    let handle = match existing {
        Some(container) => container.handle(),
        None => {
            tracing::debug!("Creating container {}", spec.name);
            engine.create_container(spec).await?
        }
    };
    engine.start_container(&handle).await
}
