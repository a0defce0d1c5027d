// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation, CRD discovery, applying nodes and driving Helm.

pub mod apply;
pub mod client;
pub mod crd;
pub mod helm;

pub use apply::KubeApplier;
pub use client::{client_from_kubeconfig, workload_client};
pub use crd::ensure_certificate_crd;
pub use helm::HelmCli;
