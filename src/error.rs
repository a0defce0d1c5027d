// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Failed to fetch chart index: {0}")]
    RemoteIndex(String),

    #[error("Chart '{chart}' not found in index {index_url}")]
    ChartNotFound { chart: String, index_url: String },

    #[error("ClusterIssuer not found: {0}")]
    IssuerNotFound(String),

    #[error("Trust anchor missing: {0}")]
    TrustAnchorMissing(String),

    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),

    #[error("Resource '{node}' failed to reconcile: {reason}")]
    ResourceReconciliation { node: String, reason: String },

    #[error("Failed waiting for {0}")]
    WaitError(String),

    #[error("Helm command failed: {0}")]
    HelmError(String),

    #[error("Invalid resource graph: {0}")]
    GraphError(String),

    #[error("Required CRD not served by the cluster: {0}")]
    MissingCrd(String),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
