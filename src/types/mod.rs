// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! cert-manager custom resources and the Helm release declaration.

pub mod certificate;
pub mod cluster_issuer;
pub mod release;

pub use certificate::Certificate;
pub use cluster_issuer::ClusterIssuer;
pub use release::HelmRelease;
