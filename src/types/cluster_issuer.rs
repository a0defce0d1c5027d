// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// cert-manager ClusterIssuer, only the CA issuer variant is modelled
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "cert-manager.io", version = "v1", kind = "ClusterIssuer")]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca: Option<CaIssuer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaIssuer {
    pub secret_name: String,
}

impl ClusterIssuer {
    /// Name of the secret holding the CA key pair, if this is a CA issuer
    pub fn ca_secret_name(&self) -> Option<&str> {
        self.spec.ca.as_ref().map(|ca| ca.secret_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_secret_name_from_ca_issuer() {
        let issuer: ClusterIssuer = serde_json::from_value(serde_json::json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "ClusterIssuer",
            "metadata": { "name": "enterprise-ca" },
            "spec": { "ca": { "secretName": "root-ca" } }
        }))
        .unwrap();

        assert_eq!(issuer.ca_secret_name(), Some("root-ca"));
    }

    #[test]
    fn test_ca_secret_name_for_acme_issuer() {
        let issuer: ClusterIssuer = serde_json::from_value(serde_json::json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "ClusterIssuer",
            "metadata": { "name": "letsencrypt" },
            "spec": { "acme": { "server": "https://acme-v02.api.letsencrypt.org/directory" } }
        }))
        .unwrap();

        assert_eq!(issuer.ca_secret_name(), None);
    }
}
