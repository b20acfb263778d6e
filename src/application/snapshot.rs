//! Point-in-time container listing for one application

use crate::engine::{ContainerEngine, ContainerSummary};
use crate::error::Result;
use crate::service::labels::LABEL_SERVICE_NAME;
use crate::service::LabelCodec;
use std::collections::HashMap;

/// Containers carrying an application's label, fetched with one listing.
///
/// Discovery and a following start or stop can share one snapshot so the
/// graph and the create-or-reuse decisions see the same container set.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Application the listing was filtered on
    app_name: String,
    /// Containers in listing order
    containers: Vec<ContainerSummary>,
}

impl Snapshot {
    /// List every container of `app_name`, stopped ones included
    pub async fn fetch<E>(app_name: &str, engine: &E) -> Result<Self>
    where
        E: ContainerEngine + ?Sized,
    {
        let containers = engine
            .list_containers(true, &LabelCodec::filters(app_name, None))
            .await?;

        Ok(Self::from_containers(app_name, containers))
    }

    /// Wrap an existing listing
    pub fn from_containers(app_name: &str, containers: Vec<ContainerSummary>) -> Self {
        Self {
            app_name: app_name.to_string(),
            containers,
        }
    }

    /// Application name
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Containers in listing order
    pub fn containers(&self) -> &[ContainerSummary] {
        &self.containers
    }

    /// Whether the listing is empty
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Containers keyed by service label; the first listed wins
    pub fn by_service(&self) -> HashMap<&str, &ContainerSummary> {
        let mut services = HashMap::new();
        for container in &self.containers {
            if let Some(service) = container.labels.get(LABEL_SERVICE_NAME) {
                services.entry(service.as_str()).or_insert(container);
            }
        }
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ContainerState;

    fn container(id: &str, service: Option<&str>) -> ContainerSummary {
        let mut labels = HashMap::new();
        if let Some(service) = service {
            labels.insert(LABEL_SERVICE_NAME.to_string(), service.to_string());
        }
        ContainerSummary {
            id: id.to_string(),
            name: id.to_string(),
            labels,
            state: ContainerState::Running,
        }
    }

    #[test]
    fn test_by_service_keeps_first_and_skips_unlabelled() {
        let snapshot = Snapshot::from_containers(
            "shop",
            vec![
                container("1", Some("web")),
                container("2", Some("web")),
                container("3", None),
                container("4", Some("db")),
            ],
        );

        let services = snapshot.by_service();
        assert_eq!(services.len(), 2);
        assert_eq!(services["web"].id, "1");
        assert_eq!(services["db"].id, "4");
    }
}
