// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::error::{ProvisionError, Result};
use kube::{discovery::Discovery, Client};
use tracing::info;

const CERT_MANAGER_GROUP: &str = "cert-manager.io";

/// Fail unless the workload cluster serves cert-manager's Certificate kind
pub async fn ensure_certificate_crd(client: &Client) -> Result<()> {
    if check_certificate_crd_exists(client).await? {
        info!("Certificate CRD ({}/v1) is available", CERT_MANAGER_GROUP);
        Ok(())
    } else {
        Err(ProvisionError::MissingCrd(format!(
            "Certificate ({}/v1); is cert-manager installed?",
            CERT_MANAGER_GROUP
        )))
    }
}

/// Check if the Certificate CRD exists by attempting to discover it.
async fn check_certificate_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[CERT_MANAGER_GROUP])
        .run()
        .await?;

    for group in discovery.groups() {
        if group.name() == CERT_MANAGER_GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.kind == "Certificate" && ar.version == "v1" {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}
