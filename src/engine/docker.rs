//! Docker Engine API client

use super::{
    ContainerEngine, ContainerHandle, ContainerSpec, ContainerState, ContainerSummary,
    EngineError, EngineResult,
};
use crate::config::EngineConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Container list item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerListItem {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
    state: ContainerState,
}

impl From<ContainerListItem> for ContainerSummary {
    fn from(item: ContainerListItem) -> Self {
        let name = item
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();

        Self {
            id: item.id,
            name,
            labels: item.labels.unwrap_or_default(),
            state: item.state,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfig<'a> {
    links: &'a [String],
    volumes_from: &'a [String],
    network_mode: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCreateRequest<'a> {
    image: &'a str,
    labels: &'a HashMap<String, String>,
    host_config: HostConfig<'a>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCreateResponse {
    id: String,
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Client for a Docker-compatible engine reachable over HTTP
pub struct DockerEngine {
    /// Engine configuration
    config: EngineConfig,
    /// HTTP client
    client: reqwest::Client,
}

impl DockerEngine {
    /// Create a client; no request is made until the first call
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    async fn post_action(&self, handle: &ContainerHandle, action: &str) -> EngineResult<()> {
        let url = self.url(&format!("/containers/{}/{}", handle.id, action));
        tracing::debug!("POST {}", url);

        let response = self.client.post(&url).send().await.map_err(transport)?;

        match response.status() {
            // 304: already in the requested state
            status if status.is_success() || status == StatusCode::NOT_MODIFIED => Ok(()),
            StatusCode::NOT_FOUND => Err(EngineError::NotFound(handle.name.clone())),
            _ => Err(api_error(response).await),
        }
    }
}

fn transport(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout(e.to_string())
    } else {
        EngineError::Transport(e.to_string())
    }
}

async fn api_error(response: reqwest::Response) -> EngineError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body),
        Err(e) => e.to_string(),
    };
    EngineError::Api { status, message }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(
        &self,
        all: bool,
        label_filters: &[String],
    ) -> EngineResult<Vec<ContainerSummary>> {
        let url = self.url("/containers/json");
        let filters = json!({ "label": label_filters }).to_string();
        tracing::debug!("GET {} filters={}", url, filters);

        let response = self
            .client
            .get(&url)
            .query(&[("all", all.to_string()), ("filters", filters)])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let items: Vec<ContainerListItem> = response.json().await.map_err(transport)?;
        Ok(items.into_iter().map(ContainerSummary::from).collect())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<ContainerHandle> {
        let image = spec.image.as_deref().ok_or_else(|| {
            EngineError::InvalidState(format!("no image configured for container {}", spec.name))
        })?;

        let url = self.url("/containers/create");
        let request = ContainerCreateRequest {
            image,
            labels: &spec.labels,
            host_config: HostConfig {
                links: &spec.links,
                volumes_from: &spec.volumes_from,
                network_mode: &spec.network_mode,
            },
        };
        tracing::debug!("POST {} name={}", url, spec.name);

        let response = self
            .client
            .post(&url)
            .query(&[("name", spec.name.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => {
                let created: ContainerCreateResponse = response.json().await.map_err(transport)?;
                for warning in created.warnings.unwrap_or_default() {
                    tracing::warn!("Engine warning for {}: {}", spec.name, warning);
                }
                Ok(ContainerHandle {
                    id: created.id,
                    name: spec.name.clone(),
                })
            }
            StatusCode::CONFLICT => Err(EngineError::Conflict(spec.name.clone())),
            _ => Err(api_error(response).await),
        }
    }

    async fn start_container(&self, handle: &ContainerHandle) -> EngineResult<()> {
        self.post_action(handle, "start").await
    }

    async fn stop_container(&self, handle: &ContainerHandle) -> EngineResult<()> {
        self.post_action(handle, "stop").await
    }
}
