//! Engine connection configuration

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default engine endpoint
pub const DEFAULT_HOST: &str = "http://localhost:2375";

/// Default engine API version
pub const DEFAULT_API_VERSION: &str = "v1.41";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How to reach the container engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine API
    pub host: String,
    /// API version path segment
    pub api_version: String,
    /// Timeout applied to every engine request
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `DOCKER_HOST` and `TETHER_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("DOCKER_HOST").ok().as_deref(),
            std::env::var("TETHER_TIMEOUT").ok().as_deref(),
        )
    }

    fn from_vars(host: Option<&str>, timeout: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = host.filter(|h| !h.is_empty()) {
            config = config.host(host)?;
        }

        if let Some(timeout) = timeout.filter(|t| !t.is_empty()) {
            let secs: u64 = timeout.parse().map_err(|_| {
                TetherError::Configuration(format!("invalid TETHER_TIMEOUT: '{}'", timeout))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the engine host.
    ///
    /// `tcp://` is treated as plain HTTP. Unix sockets are not supported.
    pub fn host(mut self, host: &str) -> Result<Self> {
        let host = host.trim_end_matches('/');
        self.host = if let Some(rest) = host.strip_prefix("tcp://") {
            format!("http://{}", rest)
        } else if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if host.starts_with("unix://") {
            return Err(TetherError::Configuration(format!(
                "unix socket engine hosts are not supported: '{}'",
                host
            )));
        } else {
            return Err(TetherError::Configuration(format!(
                "unrecognized engine host: '{}'",
                host
            )));
        };
        Ok(self)
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL including the API version
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.host, self.api_version)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
