// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Control-plane and workload cluster client creation

use crate::config::Config;
use crate::error::{ProvisionError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Create the client for the workload cluster GitLab is deployed into
pub async fn workload_client(config: &Config) -> Result<Client> {
    match &config.workload_kubeconfig {
        Some(path) => client_from_kubeconfig(path).await,
        None => {
            debug!("No workload kubeconfig configured, inferring client configuration");
            Client::try_default().await.map_err(|e| {
                ProvisionError::KubeconfigError(format!("Failed to infer config: {}", e))
            })
        }
    }
}

/// Create a Kubernetes client from a kubeconfig file
#[instrument]
pub async fn client_from_kubeconfig(path: &Path) -> Result<Client> {
    info!("Creating Kubernetes client from kubeconfig {}", path.display());

    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProvisionError::KubeconfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    client_from_kubeconfig_str(&contents).await
}

async fn client_from_kubeconfig_str(kubeconfig: &str) -> Result<Client> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| ProvisionError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                ProvisionError::KubeconfigError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| ProvisionError::KubeconfigError(format!("Failed to create client: {}", e)))
}
