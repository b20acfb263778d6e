//! Dependency graph construction

use crate::error::{Result, TetherError};
use crate::service::Service;
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph over container names.
///
/// An edge `X -> Y` means X must be running before Y starts. Nodes that
/// appear only as a dependency target are external references: the graph
/// keeps them for ordering, but nothing manages their containers.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list: node -> nodes that depend on it
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Nodes backed by a service in the input
    managed: BTreeSet<String>,
}

impl DependencyGraph {
    /// Build the graph for a collection of services
    pub fn build<'a, I>(services: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Service>,
    {
        let mut graph = Self::default();

        for service in services {
            graph.add_node(&service.name);
            graph.managed.insert(service.name.clone());

            for link in &service.links {
                graph.add_edge(&link.target, &service.name)?;
            }
            for volume in &service.volumes_from {
                graph.add_edge(volume, &service.name)?;
            }
            if let Some(other) = service.net.reused() {
                graph.add_edge(other, &service.name)?;
            }
        }

        Ok(graph)
    }

    fn add_node(&mut self, name: &str) {
        if !self.edges.contains_key(name) {
            self.edges.insert(name.to_string(), BTreeSet::new());
        }
    }

    fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Err(TetherError::Configuration(format!(
                "service '{}' depends on itself",
                to
            )));
        }

        self.add_node(from);
        self.add_node(to);
        if let Some(successors) = self.edges.get_mut(from) {
            successors.insert(to.to_string());
        }
        Ok(())
    }

    /// All node names, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Whether `name` is a node
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Whether `name` is backed by a service
    pub fn is_managed(&self, name: &str) -> bool {
        self.managed.contains(name)
    }

    /// Nodes referenced as dependencies but not backed by a service
    pub fn external(&self) -> Vec<String> {
        self.nodes()
            .filter(|name| !self.is_managed(name))
            .map(str::to_string)
            .collect()
    }

    /// Nodes that must wait for `name`
    pub fn successors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Nodes `name` waits for
    pub fn predecessors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |(_, successors)| successors.contains(name))
            .map(|(node, _)| node.as_str())
    }
}
