// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declared resources and their per-node options

use crate::constants::timeouts;
use crate::types::{Certificate, HelmRelease};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::ResourceExt;
use std::fmt;
use std::time::Duration;

/// Identifier of a node within one resource graph
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A desired target-cluster object
#[derive(Clone, Debug)]
pub enum Resource {
    Namespace(Namespace),
    Secret(Secret),
    Certificate(Certificate),
    Release(HelmRelease),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Namespace(_) => "Namespace",
            Resource::Secret(_) => "Secret",
            Resource::Certificate(_) => "Certificate",
            Resource::Release(_) => "HelmRelease",
        }
    }

    /// `namespace/name` (or just `name` for cluster-scoped objects)
    pub fn display_name(&self) -> String {
        let (namespace, name) = match self {
            Resource::Namespace(ns) => (None, ns.name_any()),
            Resource::Secret(s) => (s.namespace(), s.name_any()),
            Resource::Certificate(c) => (c.namespace(), c.name_any()),
            Resource::Release(r) => (Some(r.namespace.clone()), r.name.clone()),
        };
        match namespace {
            Some(ns) => format!("{}/{}", ns, name),
            None => name,
        }
    }
}

/// The operation the engine performs on a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// Wall-clock budgets per operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomTimeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl CustomTimeouts {
    pub fn uniform(minutes: u64) -> Self {
        let d = Duration::from_secs(minutes * 60);
        Self {
            create: d,
            update: d,
            delete: d,
        }
    }

    pub fn budget(&self, op: Operation) -> Duration {
        match op {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for CustomTimeouts {
    fn default() -> Self {
        Self::uniform(timeouts::DEFAULT_MINUTES)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeOptions {
    /// Leave the object in place when the graph is torn down
    pub retain_on_delete: bool,
    /// Delete the old object before creating a replacement when an in-place update is rejected
    pub delete_before_replace: bool,
}

#[derive(Clone, Debug)]
pub struct ResourceNode {
    pub id: NodeId,
    pub resource: Resource,
    pub timeouts: CustomTimeouts,
    pub options: NodeOptions,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, resource: Resource) -> Self {
        Self {
            id: NodeId::new(id),
            resource,
            timeouts: CustomTimeouts::default(),
            options: NodeOptions::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: CustomTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn retain_on_delete(mut self) -> Self {
        self.options.retain_on_delete = true;
        self
    }

    pub fn delete_before_replace(mut self) -> Self {
        self.options.delete_before_replace = true;
        self
    }
}
