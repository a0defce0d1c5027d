// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Loading the enterprise CA certificate from the control-plane cluster

use crate::constants::trust::{CA_CERT_KEY, CLUSTER_ISSUER, ISSUER_SECRET_NAMESPACE};
use crate::error::{ProvisionError, Result};
use crate::types::ClusterIssuer;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{Api, Client};
use tracing::{info, instrument};

pub struct CaBundleLoader {
    client: Client,
    issuer_name: String,
    secret_namespace: String,
}

impl CaBundleLoader {
    pub fn new(control_plane: Client) -> Self {
        Self {
            client: control_plane,
            issuer_name: CLUSTER_ISSUER.to_string(),
            secret_namespace: ISSUER_SECRET_NAMESPACE.to_string(),
        }
    }

    /// Read the CA certificate behind the enterprise ClusterIssuer
    #[instrument(skip(self), fields(issuer = %self.issuer_name))]
    pub async fn load(&self) -> Result<ByteString> {
        let issuers: Api<ClusterIssuer> = Api::all(self.client.clone());
        let issuer = match issuers.get(&self.issuer_name).await {
            Ok(issuer) => issuer,
            Err(kube::Error::Api(err)) if err.code == 404 => {
                return Err(ProvisionError::IssuerNotFound(self.issuer_name.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let Some(secret_name) = issuer.ca_secret_name() else {
            return Err(ProvisionError::IssuerNotFound(format!(
                "{} is not a CA issuer",
                self.issuer_name
            )));
        };

        info!(
            "Loading CA from {}/{}",
            self.secret_namespace, secret_name
        );

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.secret_namespace);
        let secret = match secrets.get(secret_name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(err)) if err.code == 404 => {
                return Err(ProvisionError::TrustAnchorMissing(format!(
                    "secret {}/{} not found",
                    self.secret_namespace, secret_name
                )))
            }
            Err(e) => return Err(e.into()),
        };

        secret
            .data
            .and_then(|mut data| data.remove(CA_CERT_KEY))
            .ok_or_else(|| {
                ProvisionError::TrustAnchorMissing(format!(
                    "secret {}/{} does not contain '{}' key",
                    self.secret_namespace, secret_name, CA_CERT_KEY
                ))
            })
    }
}
