//! Service descriptors

use super::net::NetMode;
use crate::error::{Result, TetherError};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Container names accepted by the engine
const NAME_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$";

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAME_PATTERN).expect("name pattern is a valid regex"))
}

/// Check that `name` is usable as a service or application name
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name_regex().is_match(name) {
        Ok(())
    } else {
        Err(TetherError::Configuration(format!(
            "invalid {} name: '{}'",
            kind, name
        )))
    }
}

/// Link to another container under an alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Name of the linked container
    pub target: String,
    /// Hostname the target is reachable under
    pub alias: String,
}

impl Link {
    /// Create a new link
    pub fn new(target: &str, alias: &str) -> Self {
        Self {
            target: target.to_string(),
            alias: alias.to_string(),
        }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target, self.alias)
    }
}

impl FromStr for Link {
    type Err = TetherError;

    /// Parse `target:alias`, or a bare `target` aliased to itself
    fn from_str(s: &str) -> Result<Self> {
        let (target, alias) = s.split_once(':').unwrap_or((s, s));
        if target.is_empty() || alias.is_empty() {
            return Err(TetherError::Configuration(format!("invalid link: '{}'", s)));
        }
        Ok(Link::new(target, alias))
    }
}

/// A named dependency descriptor for the container central to a service.
///
/// The service name doubles as the name of that container. Services are
/// values: build one with the chained setters, then treat it as immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Service (and container) name
    pub name: String,
    /// Owning application name
    pub app_name: String,
    /// Links to other containers, in declaration order
    pub links: Vec<Link>,
    /// Containers whose volumes are mounted
    pub volumes_from: Vec<String>,
    /// Network mode
    pub net: NetMode,
    /// Image used when the container has to be created
    pub image: Option<String>,
}

impl Service {
    /// Create a service with no dependencies on the bridge network
    pub fn new(name: &str, app_name: &str) -> Self {
        Self {
            name: name.to_string(),
            app_name: app_name.to_string(),
            links: Vec::new(),
            volumes_from: Vec::new(),
            net: NetMode::Bridge,
            image: None,
        }
    }

    /// Add a link
    pub fn link(mut self, target: &str, alias: &str) -> Self {
        self.links.push(Link::new(target, alias));
        self
    }

    /// Mount volumes from another container
    pub fn volumes_from(mut self, name: &str) -> Self {
        self.volumes_from.push(name.to_string());
        self
    }

    /// Set network mode
    pub fn net(mut self, net: NetMode) -> Self {
        self.net = net;
        self
    }

    /// Set image
    pub fn image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    /// Names of every container this service depends on, with repeats
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .map(|l| l.target.as_str())
            .chain(self.volumes_from.iter().map(String::as_str))
            .chain(self.net.reused())
    }

    /// Link strings as handed to the engine
    pub fn link_specs(&self) -> Vec<String> {
        self.links.iter().map(Link::to_string).collect()
    }

    /// Check structural validity before any engine call is made
    pub fn validate(&self) -> Result<()> {
        validate_name("service", &self.name)?;
        validate_name("application", &self.app_name)?;

        if let Some(link) = self.links.iter().find(|l| l.alias.is_empty()) {
            return Err(TetherError::Configuration(format!(
                "service '{}' has an incomplete link '{}'",
                self.name, link
            )));
        }

        // dependency names go into labels verbatim and must decode unchanged
        for dep in self.dependencies() {
            validate_name("dependency", dep)?;
        }

        if self.dependencies().any(|dep| dep == self.name) {
            return Err(TetherError::Configuration(format!(
                "service '{}' depends on itself",
                self.name
            )));
        }

        Ok(())
    }
}
