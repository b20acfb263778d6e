//! Deterministic topological ordering

use super::builder::DependencyGraph;
use crate::error::{Result, TetherError};
use std::collections::{BTreeSet, HashMap};

/// Start order over every node of the graph.
///
/// Kahn's algorithm; among nodes that are ready at the same step the
/// lexicographically smallest name goes first, so the result depends only
/// on the graph and never on the order services were supplied in.
pub fn start_order(graph: &DependencyGraph) -> Result<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = graph.nodes().map(|node| (node, 0)).collect();
    for node in graph.nodes() {
        for successor in graph.successors(node) {
            if let Some(degree) = in_degree.get_mut(successor) {
                *degree += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());

        for successor in graph.successors(node) {
            if let Some(degree) = in_degree.get_mut(successor) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(successor);
                }
            }
        }
    }

    if order.len() != graph.len() {
        let mut nodes: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(node, _)| node.to_string())
            .collect();
        nodes.sort();
        return Err(TetherError::DependencyCycle { nodes });
    }

    Ok(order)
}

/// Stop order: the start order reversed
pub fn stop_order(graph: &DependencyGraph) -> Result<Vec<String>> {
    let mut order = start_order(graph)?;
    order.reverse();
    Ok(order)
}

/// Order over the managed nodes only, in start or stop direction
pub fn topology(graph: &DependencyGraph, reverse: bool) -> Result<Vec<String>> {
    let order = if reverse {
        stop_order(graph)?
    } else {
        start_order(graph)?
    };

    Ok(order
        .into_iter()
        .filter(|node| graph.is_managed(node))
        .collect())
}
