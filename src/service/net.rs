//! Network mode of a service's container

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prefix of a network mode that reuses another container's stack
pub const CONTAINER_PREFIX: &str = "container:";

/// How a service's container attaches to the network
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetMode {
    /// New network stack on the engine bridge
    #[default]
    Bridge,
    /// No networking
    None,
    /// Host network stack
    Host,
    /// Reuse the network stack of the named container
    Container(String),
}

impl NetMode {
    /// Reuse the network stack of `reference`.
    ///
    /// Path-qualified references (`project/web`) are reduced to their final
    /// segment so they line up with service names.
    pub fn container(reference: &str) -> Result<Self> {
        let name = reference.rsplit('/').next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(TetherError::Configuration(format!(
                "network mode references an empty container name: '{}'",
                reference
            )));
        }
        Ok(NetMode::Container(name.to_string()))
    }

    /// Name of the container whose network stack is reused, if any
    pub fn reused(&self) -> Option<&str> {
        match self {
            NetMode::Container(name) => Some(name),
            _ => None,
        }
    }

    /// Engine-facing network mode string
    pub fn mode(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for NetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetMode::Bridge => write!(f, "bridge"),
            NetMode::None => write!(f, "none"),
            NetMode::Host => write!(f, "host"),
            NetMode::Container(name) => write!(f, "{}{}", CONTAINER_PREFIX, name),
        }
    }
}

impl FromStr for NetMode {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bridge" => Ok(NetMode::Bridge),
            "none" => Ok(NetMode::None),
            "host" => Ok(NetMode::Host),
            _ => match s.strip_prefix(CONTAINER_PREFIX) {
                Some(reference) => NetMode::container(reference),
                None => Err(TetherError::Configuration(format!(
                    "unrecognized network mode: '{}'",
                    s
                ))),
            },
        }
    }
}

impl TryFrom<String> for NetMode {
    type Error = TetherError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NetMode> for String {
    fn from(mode: NetMode) -> Self {
        mode.to_string()
    }
}
