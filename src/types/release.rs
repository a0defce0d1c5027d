// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;

/// A Helm release installed from a remote chart repository
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HelmRelease {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub version: String,
    pub repository: String,
    pub values: serde_json::Value,
    /// Wait for the release's workloads to become ready
    pub wait: bool,
}
