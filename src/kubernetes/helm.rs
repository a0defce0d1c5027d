// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm release management through the helm CLI

use crate::error::{ProvisionError, Result};
use crate::types::HelmRelease;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// An entry of `helm list --output json`
#[derive(Deserialize, Debug)]
struct ListedRelease {
    name: String,
    status: String,
    chart: String,
}

#[derive(Clone, Debug)]
pub struct HelmCli {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl HelmCli {
    pub fn new(binary: PathBuf, kubeconfig: Option<PathBuf>) -> Self {
        Self { binary, kubeconfig }
    }

    /// Install or upgrade the release, values are piped in on stdin
    #[instrument(skip(self, release), fields(release = %release.name, version = %release.version))]
    pub async fn upgrade_install(&self, release: &HelmRelease, timeout: Duration) -> Result<()> {
        let values = serde_yaml::to_string(&release.values)
            .map_err(|e| ProvisionError::HelmError(format!("failed to render values: {}", e)))?;

        info!(
            "Installing chart {} {} from {}",
            release.chart, release.version, release.repository
        );
        self.run(&upgrade_args(release, timeout), Some(&values))
            .await?;
        Ok(())
    }

    /// Whether helm knows the release in its namespace
    pub async fn release_exists(&self, release: &HelmRelease) -> Result<bool> {
        let args = vec![
            "status".to_string(),
            release.name.clone(),
            "--namespace".to_string(),
            release.namespace.clone(),
        ];
        let output = self.output(&args, None).await?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not found") {
            Ok(false)
        } else {
            Err(ProvisionError::HelmError(format!(
                "helm status failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Whether the deployed release already runs the declared chart version
    /// with the declared values, so an upgrade would change nothing
    #[instrument(skip(self, release), fields(release = %release.name))]
    pub async fn is_current(&self, release: &HelmRelease) -> Result<bool> {
        let args = vec![
            "list".to_string(),
            "--namespace".to_string(),
            release.namespace.clone(),
            "--filter".to_string(),
            format!("^{}$", release.name),
            "--output".to_string(),
            "json".to_string(),
        ];
        let listed: Vec<ListedRelease> = serde_json::from_str(&self.run(&args, None).await?)
            .map_err(|e| ProvisionError::HelmError(format!("unreadable helm list output: {}", e)))?;

        let chart = format!("{}-{}", release.chart, release.version);
        let Some(deployed) = listed.into_iter().find(|r| r.name == release.name) else {
            return Ok(false);
        };
        if deployed.status != "deployed" || deployed.chart != chart {
            debug!(
                "Release {} is {} with {}, want {}",
                release.name, deployed.status, deployed.chart, chart
            );
            return Ok(false);
        }

        let args = vec![
            "get".to_string(),
            "values".to_string(),
            release.name.clone(),
            "--namespace".to_string(),
            release.namespace.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        let mut values: serde_json::Value = serde_json::from_str(&self.run(&args, None).await?)
            .map_err(|e| ProvisionError::HelmError(format!("unreadable helm values: {}", e)))?;
        // A release installed without values reports null
        if values.is_null() {
            values = serde_json::json!({});
        }

        Ok(values == release.values)
    }

    pub async fn uninstall(&self, release: &HelmRelease, timeout: Duration) -> Result<()> {
        let args = vec![
            "uninstall".to_string(),
            release.name.clone(),
            "--namespace".to_string(),
            release.namespace.clone(),
            "--wait".to_string(),
            "--timeout".to_string(),
            helm_timeout(timeout),
        ];
        self.run(&args, None).await?;
        Ok(())
    }

    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String> {
        let output = self.output(args, stdin).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProvisionError::HelmError(format!(
                "helm {} failed: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn output(&self, args: &[String], stdin: Option<&str>) -> Result<Output> {
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let mut cmd = Command::new(&self.binary);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.env("KUBECONFIG", kubeconfig);
        }
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ProvisionError::HelmError(format!(
                "failed to execute {}: {}",
                self.binary.display(),
                e
            ))
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| ProvisionError::HelmError(format!("failed to write stdin: {}", e)))?;
            // Closing stdin lets helm finish reading the values
            drop(pipe);
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| ProvisionError::HelmError(format!("failed to wait for helm: {}", e)))
    }
}

/// Arguments of `helm upgrade --install` for a release
pub fn upgrade_args(release: &HelmRelease, timeout: Duration) -> Vec<String> {
    let mut args: Vec<String> = [
        "upgrade",
        "--install",
        release.name.as_str(),
        release.chart.as_str(),
        "--repo",
        release.repository.as_str(),
        "--version",
        release.version.as_str(),
        "--namespace",
        release.namespace.as_str(),
        "--values",
        "-",
        "--timeout",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(helm_timeout(timeout));
    if release.wait {
        args.push("--wait".to_string());
    }
    args
}

fn helm_timeout(timeout: Duration) -> String {
    format!("{}s", timeout.as_secs())
}
