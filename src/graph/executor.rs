// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Dependency-ordered submission and teardown of a resource graph

use super::node::{NodeId, Operation, ResourceNode};
use super::ResourceGraph;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument};

/// Performs the actual create/update/delete of a single node
#[async_trait]
pub trait Applier: Send + Sync {
    /// Whether the object behind the node already exists in the target cluster
    async fn exists(&self, node: &ResourceNode) -> Result<bool>;

    /// Create or update the object until it has converged
    async fn apply(&self, node: &ResourceNode, op: Operation) -> Result<()>;

    async fn delete(&self, node: &ResourceNode) -> Result<()>;
}

/// A node that reached its desired state during submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converged {
    pub id: NodeId,
    pub operation: Operation,
}

/// Submit every node of the graph, never starting a node before all of its
/// predecessors have converged. Independent nodes run concurrently.
///
/// The first failure aborts the submission: in-flight nodes are cancelled,
/// nothing further is started and nothing already converged is rolled back.
pub async fn submit<A>(graph: &ResourceGraph, applier: &A) -> Result<Vec<Converged>>
where
    A: Applier + ?Sized,
{
    // Rejects cyclic graphs before anything is touched
    graph.topological_order()?;

    let nodes = graph.nodes();
    let dependents = graph.dependents();
    let mut remaining: Vec<usize> = (0..nodes.len())
        .map(|pos| graph.predecessors(pos).len())
        .collect();

    let mut in_flight = FuturesUnordered::new();
    for (pos, node) in nodes.iter().enumerate() {
        if remaining[pos] == 0 {
            in_flight.push(converge(pos, node, applier));
        }
    }

    let mut converged = Vec::with_capacity(nodes.len());
    while let Some((pos, result)) = in_flight.next().await {
        let operation = result?;
        let node = &nodes[pos];
        info!(
            "{} {} converged ({})",
            node.resource.kind(),
            node.resource.display_name(),
            operation
        );
        converged.push(Converged {
            id: node.id.clone(),
            operation,
        });

        for &next in &dependents[pos] {
            remaining[next] -= 1;
            if remaining[next] == 0 {
                in_flight.push(converge(next, &nodes[next], applier));
            }
        }
    }

    Ok(converged)
}

#[instrument(skip(node, applier), fields(node = %node.id))]
async fn converge<A>(pos: usize, node: &ResourceNode, applier: &A) -> (usize, Result<Operation>)
where
    A: Applier + ?Sized,
{
    let result = async {
        // The existence check is part of the operation and spends its budget
        let started = Instant::now();
        let check_budget = node.timeouts.create.max(node.timeouts.update);
        let found = run_within(
            node,
            "existence check",
            started,
            check_budget,
            applier.exists(node),
        )
        .await?;
        let op = if found {
            Operation::Update
        } else {
            Operation::Create
        };

        let budget = node.timeouts.budget(op);
        debug!(
            "Starting {} of {} {} (budget {:?})",
            op,
            node.resource.kind(),
            node.resource.display_name(),
            budget
        );
        run_within(node, op, started, budget, applier.apply(node, op)).await?;
        Ok(op)
    }
    .await;

    (pos, result)
}

/// Delete the graph's nodes in reverse dependency order. Nodes marked
/// `retain_on_delete` and nodes that no longer exist are skipped.
pub async fn teardown<A>(graph: &ResourceGraph, applier: &A) -> Result<Vec<NodeId>>
where
    A: Applier + ?Sized,
{
    let order = graph.topological_order()?;
    let mut deleted = Vec::new();

    for node in order.into_iter().rev() {
        if node.options.retain_on_delete {
            info!(
                "Retaining {} {}",
                node.resource.kind(),
                node.resource.display_name()
            );
            continue;
        }

        let started = Instant::now();
        let budget = node.timeouts.budget(Operation::Delete);
        if !run_within(node, "existence check", started, budget, applier.exists(node)).await? {
            debug!("{} already absent", node.id);
            continue;
        }

        run_within(node, Operation::Delete, started, budget, applier.delete(node)).await?;
        info!(
            "{} {} deleted",
            node.resource.kind(),
            node.resource.display_name()
        );
        deleted.push(node.id.clone());
    }

    Ok(deleted)
}

/// Run one step of a node's operation; the budget counts from `started`
async fn run_within<T, F>(
    node: &ResourceNode,
    step: impl fmt::Display,
    started: Instant,
    budget: Duration,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout_at(started + budget, fut).await {
        Ok(result) => result.map_err(|e| failed(node, e)),
        Err(_) => Err(ProvisionError::ResourceReconciliation {
            node: node.id.to_string(),
            reason: format!("{} did not complete within {:?}", step, budget),
        }),
    }
}

fn failed(node: &ResourceNode, error: ProvisionError) -> ProvisionError {
    match error {
        e @ ProvisionError::ResourceReconciliation { .. } => e,
        e => ProvisionError::ResourceReconciliation {
            node: node.id.to_string(),
            reason: e.to_string(),
        },
    }
}
