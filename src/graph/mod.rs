// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Dependency graph of declared resources and its ordered submission.

pub mod executor;
pub mod node;

pub use executor::{submit, teardown, Applier};
pub use node::{CustomTimeouts, NodeId, NodeOptions, Operation, Resource, ResourceNode};

use crate::error::{ProvisionError, Result};
use std::collections::{BTreeSet, HashMap};

/// A directed acyclic graph of resource nodes.
///
/// Dependencies must be added before their dependents, so the graph cannot
/// contain a cycle.
#[derive(Debug, Default)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeId, usize>,
    /// Predecessors of each node, by position
    depends_on: Vec<Vec<usize>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node that may only be created once all of `deps` have converged
    pub fn add(&mut self, node: ResourceNode, deps: &[&NodeId]) -> Result<NodeId> {
        if self.index.contains_key(&node.id) {
            return Err(ProvisionError::GraphError(format!(
                "duplicate node '{}'",
                node.id
            )));
        }

        let mut preds = Vec::with_capacity(deps.len());
        for dep in deps {
            let Some(&pos) = self.index.get(*dep) else {
                return Err(ProvisionError::GraphError(format!(
                    "node '{}' depends on unknown node '{}'",
                    node.id, dep
                )));
            };
            if !preds.contains(&pos) {
                preds.push(pos);
            }
        }

        let id = node.id.clone();
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.depends_on.push(preds);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn get(&self, id: &NodeId) -> Option<&ResourceNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Direct predecessors of a node
    pub fn dependencies(&self, id: &NodeId) -> Vec<&NodeId> {
        self.index
            .get(id)
            .map(|&pos| {
                self.depends_on[pos]
                    .iter()
                    .map(|&p| &self.nodes[p].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn predecessors(&self, pos: usize) -> &[usize] {
        &self.depends_on[pos]
    }

    /// Successors of every node, by position
    pub(crate) fn dependents(&self) -> Vec<Vec<usize>> {
        let mut dependents = vec![Vec::new(); self.nodes.len()];
        for (pos, preds) in self.depends_on.iter().enumerate() {
            for &p in preds {
                dependents[p].push(pos);
            }
        }
        dependents
    }

    /// Kahn's algorithm, ties broken by insertion order
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>> {
        let dependents = self.dependents();
        let mut remaining: Vec<usize> = self.depends_on.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(pos) = ready.pop_first() {
            order.push(&self.nodes[pos]);
            for &next in &dependents[pos] {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(ProvisionError::GraphError(
                "dependency cycle detected".to_string(),
            ));
        }
        Ok(order)
    }
}
