// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_OIDC_NAMESPACE: &str = "openunison";
const DEFAULT_GITLAB_NAMESPACE: &str = "gitlab";
const DEFAULT_CHART_REPOSITORY: &str = "https://charts.gitlab.io";
const DEFAULT_HELM_BINARY: &str = "helm";

/// Provisioner configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// DNS suffix for the public hostnames of the deployment
    pub dns_suffix: String,
    /// Kubeconfig of the control-plane cluster holding the enterprise CA
    pub control_plane_kubeconfig: PathBuf,
    /// Kubeconfig of the workload cluster; inferred when unset
    pub workload_kubeconfig: Option<PathBuf>,
    /// Namespace of the OIDC client credential secret
    pub oidc_namespace: String,
    pub gitlab_namespace: String,
    pub chart_repository: String,
    /// Pinned chart version, skips the index lookup when set
    pub chart_version: Option<String>,
    pub helm_binary: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dns_suffix = non_empty("GITLAB_DNS_SUFFIX")
            .context("GITLAB_DNS_SUFFIX environment variable not set")?
            .trim_matches('.')
            .to_string();
        let control_plane_kubeconfig = non_empty("CONTROL_PLANE_KUBECONFIG")
            .map(PathBuf::from)
            .context("CONTROL_PLANE_KUBECONFIG environment variable not set")?;

        Ok(Config {
            dns_suffix,
            control_plane_kubeconfig,
            workload_kubeconfig: non_empty("WORKLOAD_KUBECONFIG").map(PathBuf::from),
            oidc_namespace: non_empty("OIDC_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_OIDC_NAMESPACE.to_string()),
            gitlab_namespace: non_empty("GITLAB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_GITLAB_NAMESPACE.to_string()),
            chart_repository: non_empty("GITLAB_CHART_REPOSITORY")
                .unwrap_or_else(|| DEFAULT_CHART_REPOSITORY.to_string()),
            chart_version: non_empty("GITLAB_CHART_VERSION"),
            helm_binary: non_empty("HELM_BINARY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HELM_BINARY)),
        })
    }
}
