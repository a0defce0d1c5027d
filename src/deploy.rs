// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Runs one provisioning pass: resolve inputs, compose the graph, submit it.

use crate::chart::ChartVersionResolver;
use crate::config::Config;
use crate::constants::{gitlab, nodes};
use crate::credentials::{credential_secret, Credential, OidcProvisioner, ProvisionedCredential};
use crate::error::Result;
use crate::gitlab::{build_graph, DeploymentInputs};
use crate::graph::executor::Converged;
use crate::graph::{submit, teardown, NodeId, Resource, ResourceGraph, ResourceNode};
use crate::kubernetes::{
    client_from_kubeconfig, ensure_certificate_crd, workload_client, HelmCli, KubeApplier,
};
use crate::trust::CaBundleLoader;
use k8s_openapi::ByteString;
use kube::Client;
use tracing::{info, instrument};

pub struct Deployment {
    config: Config,
    control_plane: Client,
    workload: Client,
    resolver: ChartVersionResolver,
}

impl Deployment {
    pub fn new(config: Config, control_plane: Client, workload: Client) -> Self {
        Self {
            config,
            control_plane,
            workload,
            resolver: ChartVersionResolver::new(),
        }
    }

    /// Build clients for both clusters from the configuration
    pub async fn connect(config: Config) -> Result<Self> {
        let control_plane = client_from_kubeconfig(&config.control_plane_kubeconfig).await?;
        let workload = workload_client(&config).await?;
        info!("Connected to control-plane and workload clusters");
        Ok(Self::new(config, control_plane, workload))
    }

    async fn chart_version(&self) -> Result<String> {
        if let Some(version) = &self.config.chart_version {
            info!("Using pinned chart version {}", version);
            return Ok(version.clone());
        }
        self.resolver
            .latest_version(&self.config.chart_repository, gitlab::CHART_NAME)
            .await
    }

    /// Resolve every input and compose the deployment's graph. The CA bundle
    /// is loaded once and reused for every key it is published under.
    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<ResourceGraph> {
        let loader = CaBundleLoader::new(self.control_plane.clone());
        let (chart_version, ca_bundle) = tokio::try_join!(self.chart_version(), loader.load())?;

        let credential = OidcProvisioner::new(self.workload.clone(), &self.config.oidc_namespace)
            .provision()
            .await?;

        build_graph(
            &self.config,
            DeploymentInputs {
                chart_version,
                ca_bundle,
                credential,
            },
        )
    }

    /// Converge every resource of the deployment
    pub async fn apply(&self) -> Result<Vec<Converged>> {
        ensure_certificate_crd(&self.workload).await?;
        let graph = self.plan().await?;
        info!("Submitting {} resources", graph.len());
        submit(&graph, &self.applier()).await
    }

    /// Delete the deployment's resources; the namespace is retained
    pub async fn destroy(&self) -> Result<Vec<NodeId>> {
        let graph = build_graph(&self.config, self.teardown_inputs())?;
        teardown(&graph, &self.applier()).await
    }

    /// Deletion only needs object names, so nothing is resolved remotely
    fn teardown_inputs(&self) -> DeploymentInputs {
        let credential = Credential::generate();
        DeploymentInputs {
            chart_version: self
                .config
                .chart_version
                .clone()
                .unwrap_or_default(),
            ca_bundle: ByteString(Vec::new()),
            credential: ProvisionedCredential {
                node: ResourceNode::new(
                    nodes::OIDC_CREDENTIAL,
                    Resource::Secret(credential_secret(
                        &self.config.oidc_namespace,
                        gitlab::OIDC_SECRET,
                        &credential,
                    )),
                ),
                credential,
                generated: false,
            },
        }
    }

    fn applier(&self) -> KubeApplier {
        KubeApplier::new(
            self.workload.clone(),
            HelmCli::new(
                self.config.helm_binary.clone(),
                self.config.workload_kubeconfig.clone(),
            ),
        )
    }
}

/// Human readable rendering of a graph, one node per line in submission order
pub fn describe(graph: &ResourceGraph) -> Result<String> {
    let mut out = String::new();
    for node in graph.topological_order()? {
        let deps: Vec<&str> = graph
            .dependencies(&node.id)
            .into_iter()
            .map(NodeId::as_str)
            .collect();
        out.push_str(&format!(
            "{} {} {}",
            node.id,
            node.resource.kind(),
            node.resource.display_name()
        ));
        if !deps.is_empty() {
            out.push_str(&format!(" <- {}", deps.join(", ")));
        }
        out.push('\n');
    }
    Ok(out)
}
